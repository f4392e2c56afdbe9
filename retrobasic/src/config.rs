//! `retrobasic.toml` configuration

use crate::error::{Error, Result};
use crate::interp::{DEFAULT_MAX_CALL_DEPTH, ExecOptions};
use crate::lexer::ScanOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File looked up in the working directory when no `--config` is given
pub const CONFIG_FILE: &str = "retrobasic.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub scanner: ScannerConfig,
    pub repl: ReplConfig,
}

/// Execution budgets
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Statement budget per run; absent means unlimited
    pub max_steps: Option<u64>,
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub keep_comments: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplConfig {
    pub prompt: String,
    /// History file name, relative to the home directory
    pub history_file: Option<String>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "] ".to_string(),
            history_file: Some(".retrobasic_history".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Self::parse(&data).map_err(|err| Error::config_error(format!("{}: {}", path.display(), err.message())))
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::config_error(err.message().to_string()))
    }

    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            max_steps: self.limits.max_steps,
            max_call_depth: self.limits.max_call_depth,
            ..ExecOptions::default()
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            keep_comments: self.scanner.keep_comments,
        }
    }
}
