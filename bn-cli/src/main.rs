mod logging;
mod script;

use anyhow::{Context, Result};
use bn_core::{Config, Module};
use clap::{ArgAction, Parser};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
};

#[derive(clap::Parser, Clone, Debug)]
#[command(
    name = "bnc",
    about = "Evaluate arbitrary-precision integer operations",
    version,
    disable_help_subcommand = true
)]
struct Opt {
    #[command(subcommand)]
    command: CommandsOpt,
    /// Configuration file (.json, .yaml or .yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Verbosity level, repeat for more output
    #[arg(short, global = true, action = ArgAction::Count)]
    verbosity: u8,
}

#[derive(clap::Subcommand, Clone, Debug)]
enum CommandsOpt {
    /// Evaluate a single function
    ///
    /// Numeric arguments are host numbers; `0x..` and quoted arguments are passed as text.
    Call {
        /// Function name, e.g. `add` or `modpow`
        name: String,
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Evaluate one call per line, reading stdin when no file is given
    Script { file: Option<PathBuf> },
    /// List the available functions
    Functions,
}

fn main() -> Result<()> {
    let Opt {
        command,
        config,
        verbosity,
    } = Opt::parse();
    logging::set_log_level(verbosity);

    let config = match config {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let mut module = Module::new(config).context("setting up the bn context")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        CommandsOpt::Call { name, args } => {
            let mut session = script::Session::new(&mut module);
            let value = session.call(&name, &args)?;
            writeln!(out, "{}", session.render(&value)?)?;
        }
        CommandsOpt::Script { file } => {
            let input: Box<dyn BufRead> = match file {
                Some(path) => Box::new(BufReader::new(
                    File::open(&path).with_context(|| format!("opening {}", path.display()))?,
                )),
                None => Box::new(BufReader::new(io::stdin())),
            };
            script::run(&mut module, input, &mut out)?;
        }
        CommandsOpt::Functions => {
            for name in module.function_names() {
                writeln!(out, "{}", name)?;
            }
        }
    }
    Ok(())
}
