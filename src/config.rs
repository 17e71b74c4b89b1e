//! Application configuration.
//!
//! Values come from defaults, then an optional TOML file, then
//! `STUDYBUD_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StudyError};
use crate::model::Difficulty;

pub const CONFIG_PATH_ENV: &str = "STUDYBUD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "studybud.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default)]
    pub default_difficulty: Difficulty,
    #[serde(default = "default_subjects")]
    pub allowed_subjects: Vec<String>,
    /// Fixes the schedule generator's random source when set.
    #[serde(default)]
    pub schedule_seed: Option<u64>,
    #[serde(default = "default_max_practice_questions")]
    pub max_practice_questions: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_practice_questions() -> usize {
    10
}

pub fn default_subjects() -> Vec<String> {
    [
        "programming",
        "web_dev",
        "mobile_dev",
        "ai",
        "software_eng",
        "networks",
        "databases",
        "os",
        "architecture",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            host: default_host(),
            port: default_port(),
            default_language: default_language(),
            default_difficulty: Difficulty::default(),
            allowed_subjects: default_subjects(),
            schedule_seed: None,
            max_practice_questions: default_max_practice_questions(),
        }
    }
}

impl AppConfig {
    /// Loads the config file named by `STUDYBUD_CONFIG` (or `studybud.toml`
    /// when present) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| StudyError::Config(e.to_string()))
    }

    /// Applies `STUDYBUD_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("STUDYBUD_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup("STUDYBUD_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("STUDYBUD_PORT") {
            self.port = port
                .parse()
                .map_err(|_| StudyError::Config(format!("invalid STUDYBUD_PORT '{}'", port)))?;
        }
        if let Some(seed) = lookup("STUDYBUD_SEED") {
            let seed = seed
                .parse()
                .map_err(|_| StudyError::Config(format!("invalid STUDYBUD_SEED '{}'", seed)))?;
            self.schedule_seed = Some(seed);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_subjects.is_empty() {
            return Err(StudyError::Config("allowed_subjects must not be empty".to_string()));
        }
        if self.max_practice_questions == 0 {
            return Err(StudyError::Config(
                "max_practice_questions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
