use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::chart::ColorScheme;
use crate::render::DEFAULT_MAX_POINTS;

pub const DEFAULT_HISTORY_WINDOW: usize = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub charts_dir: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
    /// Sampling cap for rendered x labels.
    pub max_points: usize,
    /// Turns of history handed to the interpreter.
    pub history_window: usize,
    pub keep_latest_only: bool,
    pub default_style: ColorScheme,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            data_dir: None,
            charts_dir: None,
            session_file: None,
            max_points: DEFAULT_MAX_POINTS,
            history_window: DEFAULT_HISTORY_WINDOW,
            keep_latest_only: true,
            default_style: ColorScheme::Fd,
            log_level: "info".to_string(),
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("invalid config file {:?}", config_path))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Apply `.env` and `CHARTDESK_*` overrides on top of the file settings.
    pub fn with_env(mut self) -> Result<Self> {
        dotenvy::dotenv().ok();

        if let Ok(dir) = env::var("CHARTDESK_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = env::var("CHARTDESK_CHARTS_DIR") {
            self.charts_dir = Some(PathBuf::from(dir));
        }
        if let Ok(cap) = env::var("CHARTDESK_MAX_POINTS") {
            self.max_points = cap
                .parse()
                .map_err(|_| anyhow!("CHARTDESK_MAX_POINTS must be a positive integer, got '{}'", cap))?;
        }
        if let Ok(level) = env::var("CHARTDESK_LOG") {
            self.log_level = level;
        }
        Ok(self)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("chartdesk"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.charts_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("charts"))
    }

    pub fn session_file(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("sessions.json"))
    }

    /// Create the data and charts directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.data_dir())?;
        fs::create_dir_all(self.charts_dir())?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chartdesk").join("config.json"))
    }
}
