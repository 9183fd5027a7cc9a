use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_color() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Directory script commands are loaded from. Defaults to `scripts/`
    /// next to the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_dir: Option<PathBuf>,
    /// Directory save slots live in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
    #[serde(default = "default_color")]
    pub color: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_slot: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            script_dir: None,
            save_dir: None,
            color: true,
            last_slot: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound(PathBuf),
    InvalidJson(String),
    IoError(std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => write!(f, "Config file not found: {}", path.display()),
            ConfigError::InvalidJson(msg) => write!(f, "Invalid JSON in config: {}", msg),
            ConfigError::IoError(e) => write!(f, "IO error reading config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config").join("grimvale.json"))
}

pub fn load_config() -> Result<GameConfig, ConfigError> {
    let path = config_path()
        .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config/grimvale.json")))?;

    if !path.exists() {
        return Err(ConfigError::NotFound(path));
    }

    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|e| ConfigError::InvalidJson(e.to_string()))
}

impl GameConfig {
    /// Where script commands come from, configured or default.
    pub fn scripts_path(&self) -> PathBuf {
        self.script_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("scripts"))
    }

    /// Where save slots go, configured or default.
    pub fn saves_path(&self) -> PathBuf {
        self.save_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("grimvale")
                .join("saves")
        })
    }

    pub fn set_last_slot(&mut self, slot: &str) {
        self.last_slot = Some(slot.to_string());
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()
            .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config/grimvale.json")))?;

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidJson(e.to_string()))?;

        fs::write(&path, content)?;
        Ok(())
    }
}
