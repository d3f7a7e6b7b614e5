use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::filetype::DEFAULT_MATCH_RATIO;
use crate::matcher::{MatchOptions, DEFAULT_SKIP_EXTENSIONS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_backup")]
    pub backup: bool,
}

fn default_backup() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_report_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_report_title")]
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
            title: default_report_title(),
        }
    }
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_report_title() -> String {
    "Partner file check".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    #[serde(default = "default_skip_extensions")]
    pub skip_extensions: Vec<String>,
    #[serde(default = "default_filetype_match_ratio")]
    pub filetype_match_ratio: u8,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            skip_extensions: default_skip_extensions(),
            filetype_match_ratio: default_filetype_match_ratio(),
        }
    }
}

fn default_skip_extensions() -> Vec<String> {
    DEFAULT_SKIP_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}
fn default_filetype_match_ratio() -> u8 {
    DEFAULT_MATCH_RATIO
}

impl MatchingConfig {
    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            skip_extensions: self.skip_extensions.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl SeedConfig {
    /// Seed files in the order they should be loaded.
    pub fn paths(&self) -> Vec<PathBuf> {
        let base = self.dir.clone().unwrap_or_else(|| PathBuf::from("."));
        self.files.iter().map(|f| base.join(f)).collect()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if !(1..=100).contains(&config.matching.filetype_match_ratio) {
        anyhow::bail!("matching.filetype_match_ratio must be in [1, 100]");
    }

    config.matching.skip_extensions = config
        .matching
        .skip_extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();
    if config.matching.skip_extensions.iter().any(String::is_empty) {
        anyhow::bail!("matching.skip_extensions must not contain empty entries");
    }

    Ok(config)
}
