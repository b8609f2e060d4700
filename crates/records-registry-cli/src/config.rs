//! CLI configuration — home directory resolution and `config.json`.
//!
//! Home is `--home`, else `$SRR_HOME`, else `$HOME/.srms`. A missing
//! `config.json` means all defaults.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use records_registry::JournalOptions;

const CONFIG_FILE: &str = "config.json";
const HOME_ENV: &str = "SRR_HOME";

/// Contents of `{home}/config.json`. Relative paths resolve against home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub ledger_file: PathBuf,
    pub key_dir: PathBuf,
    pub sync_writes: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            ledger_file: PathBuf::from("ledger.jsonl"),
            key_dir: PathBuf::from("keys"),
            sync_writes: true,
        }
    }
}

/// Fully resolved settings for one CLI invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub ledger_file: PathBuf,
    pub key_dir: PathBuf,
    pub journal: JournalOptions,
}

impl Config {
    /// Resolve the home directory and load `config.json` if present.
    pub fn load(home_flag: Option<&Path>) -> Result<Self> {
        let home = resolve_home(home_flag)?;
        let path = home.join(CONFIG_FILE);

        let file = if path.exists() {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_slice::<FileConfig>(&bytes)
                .with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            FileConfig::default()
        };

        log::debug!("using home {} with {:?}", home.display(), file);
        Ok(Self::resolve(home, file))
    }

    fn resolve(home: PathBuf, file: FileConfig) -> Self {
        Self {
            ledger_file: home.join(file.ledger_file),
            key_dir: home.join(file.key_dir),
            journal: JournalOptions {
                sync_writes: file.sync_writes,
            },
            home,
        }
    }

    /// Path of the key file called `name`.
    pub fn key_path(&self, name: &str) -> PathBuf {
        self.key_dir.join(format!("{name}.srk"))
    }
}

fn resolve_home(home_flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(home) = home_flag {
        return Ok(home.to_path_buf());
    }
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    let user_home =
        std::env::var("HOME").map_err(|_| anyhow!("neither {HOME_ENV} nor HOME is set"))?;
    Ok(PathBuf::from(user_home).join(".srms"))
}
