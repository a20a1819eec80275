//! TOML configuration for the vouch auditor.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Audit log storage.
    pub auditor: AuditorSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[auditor]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuditorSection {
    /// Directory holding the persisted audit log.
    pub data_dir: PathBuf,
    /// Keep the audit log in memory only. Nothing survives the command,
    /// so this is only useful for checking snapshot files.
    pub memory: bool,
}

impl Default for AuditorSection {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".vouch"))
            .unwrap_or_else(|| PathBuf::from(".vouch"));
        Self {
            data_dir,
            memory: false,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Where the history store lives inside the data directory.
    pub fn history_path(&self) -> PathBuf {
        self.auditor.data_dir.join("history")
    }
}
