//! Evaluation of calls written as text: `name arg arg ...`, one per line.
use anyhow::{Context, Result};
use bn_core::{Module, Value};
use std::io::{BufRead, Write};
use tracing::debug;

/// A sequence of calls whose earlier results can be referred to as `_` (the latest)
/// or `$n` (the result of the n-th call).
pub struct Session<'a> {
    module: &'a mut Module,
    results: Vec<Value>,
}

impl<'a> Session<'a> {
    pub fn new(module: &'a mut Module) -> Self {
        Self {
            module,
            results: vec![],
        }
    }

    fn argument(&self, text: &str) -> Result<Value> {
        if text == "_" {
            return self.results.last().cloned().context("`_` used before any result");
        }
        if let Some(index) = text.strip_prefix('$') {
            let n: usize = index
                .parse()
                .with_context(|| format!("`{}` is not a result reference", text))?;
            return self
                .results
                .get(n.wrapping_sub(1))
                .cloned()
                .with_context(|| format!("there is no result {} yet", text));
        }
        Ok(match unquote(text) {
            Some(inner) => Value::from(inner),
            None => self.module.literal(text),
        })
    }

    pub fn call(&mut self, name: &str, args: &[String]) -> Result<Value> {
        let args = args
            .iter()
            .map(|a| self.argument(a))
            .collect::<Result<Vec<_>>>()?;
        let value = self.module.call(name, &args)?;
        self.results.push(value.clone());
        Ok(value)
    }

    /// Text for a result: big integers through `tostring`, bytes as hex.
    pub fn render(&mut self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::Bn(_) => self.module.call("tostring", std::slice::from_ref(value))?.to_string(),
            Value::Bytes(bytes) => hex::encode(bytes),
            other => other.to_string(),
        })
    }
}

fn unquote(text: &str) -> Option<&str> {
    ['"', '\'']
        .into_iter()
        .find_map(|q| text.strip_prefix(q).and_then(|t| t.strip_suffix(q)))
}

/// Evaluate every line of `input`, writing one result per call to `out`.
pub fn run(module: &mut Module, input: impl BufRead, mut out: impl Write) -> Result<()> {
    let mut session = Session::new(module);
    for (n, line) in input.lines().enumerate() {
        let line = line?;
        let code = match line.find('#') {
            Some(i) => &line[..i],
            None => &line,
        };
        let mut words = code.split_whitespace();
        let name = match words.next() {
            Some(name) => name,
            None => continue,
        };
        let args = words.map(str::to_owned).collect::<Vec<_>>();
        let value = session
            .call(name, &args)
            .with_context(|| format!("line {}: {}", n + 1, code.trim()))?;
        debug!(line = n + 1, name, "evaluated");
        writeln!(out, "{}", session.render(&value)?)?;
    }
    Ok(())
}
