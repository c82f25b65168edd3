use crate::number::NumberKind;
use anyhow::{bail, Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Temporaries reserved in the scratch workspace when a context is created.
    #[serde(default = "defaults::scratch_slots")]
    pub scratch_slots: usize,
    /// Word queued failures with their reason strings, so errors read
    /// "bn.div: division by zero" instead of "bn.div: error code 103".
    #[serde(default = "defaults::load_error_strings")]
    pub load_error_strings: bool,
    /// What numeric literals of the host become.
    #[serde(default)]
    pub number_kind: NumberKind,
    /// `tobin` encodings longer than this go through the value's pending buffer.
    #[serde(default = "defaults::inline_bin_bytes")]
    pub inline_bin_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scratch_slots: defaults::scratch_slots(),
            load_error_strings: defaults::load_error_strings(),
            number_kind: Default::default(),
            inline_bin_bytes: defaults::inline_bin_bytes(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a configuration file, YAML or JSON depending on its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            _ => bail!("config file {} must end in .json, .yaml or .yml", path.display()),
        };
        parsed.with_context(|| format!("parsing config file {}", path.display()))
    }
}

mod defaults {
    pub fn scratch_slots() -> usize {
        4
    }

    pub fn load_error_strings() -> bool {
        true
    }

    pub fn inline_bin_bytes() -> usize {
        1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn should_fill_in_defaults() {
        let cfg = Config::from_json(r#"{ "number_kind": "i128" }"#).unwrap();
        assert_eq!(
            cfg,
            Config {
                scratch_slots: 4,
                load_error_strings: true,
                number_kind: NumberKind::I128,
                inline_bin_bytes: 1024,
            }
        );
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn should_read_yaml_files() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "scratch_slots: 8\nload_error_strings: false").unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.scratch_slots, 8);
        assert!(!cfg.load_error_strings);
        assert_eq!(cfg.number_kind, NumberKind::F64);
    }

    #[test]
    fn should_reject_unknown_formats() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("must end in .json, .yaml or .yml"));
    }

    #[test]
    fn should_reject_bad_number_kinds() {
        assert!(Config::from_yaml("number_kind: u8").is_err());
    }
}
