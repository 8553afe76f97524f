//! A minimal `server.properties`-style key/value file, in the style of
//! the reference server's own properties loader.

use crate::error::{Result, TunnelError};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed `key=value` properties, order-independent, comments (`#...`)
/// and blank lines ignored.
#[derive(Debug, Clone, Default)]
pub struct TunnelProperties {
    values: BTreeMap<String, String>,
}

impl TunnelProperties {
    /// An empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties from file contents.
    pub fn parse(contents: &str) -> Self {
        let mut values = BTreeMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { values }
    }

    /// Load properties from a file on disk.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|err| TunnelError::Persistence(format!("{}: {err}", path.as_ref().display())))?;
        Ok(Self::parse(&contents))
    }

    /// Save properties to a file on disk.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut contents = String::new();
        for (key, value) in &self.values {
            contents.push_str(key);
            contents.push('=');
            contents.push_str(value);
            contents.push('\n');
        }
        std::fs::write(path.as_ref(), contents)
            .map_err(|err| TunnelError::Persistence(format!("{}: {err}", path.as_ref().display())))
    }

    /// Set a raw string property.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Read a boolean property, defaulting if absent or unparseable.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(default)
    }

    /// Read an integer property, defaulting if absent or unparseable.
    pub fn int_or(&self, key: &str, default: i32) -> i32 {
        self.values
            .get(key)
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(default)
    }

    /// Read a string property, defaulting if absent.
    pub fn string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values.get(key).map(String::as_str).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines_and_ignores_comments() {
        let props = TunnelProperties::parse(
            "# comment\nuse-slashes=false\n\nmax-players=64\nmotd = hello world\n",
        );
        assert!(!props.bool_or("use-slashes", true));
        assert_eq!(props.int_or("max-players", 0), 64);
        assert_eq!(props.string_or("motd", ""), "hello world");
    }

    #[test]
    fn missing_keys_fall_back_to_default() {
        let props = TunnelProperties::new();
        assert!(props.bool_or("missing", true));
        assert_eq!(props.int_or("missing", 42), 42);
    }
}
