use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use egui::Vec2;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use trackside::{
    ReplayError, SessionType,
    backend::http::DEFAULT_SERVER_URL,
};

const CONFIG_DIR_NAME: &str = "trackside";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_WINDOW_WIDTH: f32 = 1280.;
const DEFAULT_WINDOW_HEIGHT: f32 = 800.;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct WindowSize {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

impl From<WindowSize> for Vec2 {
    fn from(value: WindowSize) -> Self {
        Vec2::new(value.width, value.height)
    }
}

impl From<Vec2> for WindowSize {
    fn from(value: Vec2) -> Self {
        Self {
            width: value.x,
            height: value.y,
        }
    }
}

/// Settings remembered between runs. Command line flags win over the file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) server_url: String,
    pub(crate) last_year: Option<i32>,
    pub(crate) last_round: Option<u32>,
    pub(crate) last_session_type: Option<SessionType>,
    pub(crate) window_size: WindowSize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            last_year: None,
            last_round: None,
            last_session_type: None,
            window_size: WindowSize::default(),
        }
    }
}

impl AppConfig {
    fn default_path() -> Option<PathBuf> {
        Some(
            dirs::config_dir()?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    /// Reads the config from the user's config directory. A missing file
    /// gives `None`; an unreadable one is logged and ignored.
    pub(crate) fn from_local_file() -> Option<Self> {
        let config_path = Self::default_path()?;
        match Self::from_path(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {:?}: {}", config_path, e);
                None
            }
        }
    }

    pub(crate) fn from_path(config_path: &Path) -> Result<Option<Self>, ReplayError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file =
            File::open(config_path).map_err(|e| ReplayError::ConfigIOError { source: e })?;
        serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|e| ReplayError::ConfigSerializeError { source: e })
    }

    pub(crate) fn save(&self) -> Result<(), ReplayError> {
        let config_path = Self::default_path().ok_or(ReplayError::NoConfigDir)?;
        self.save_to(&config_path)
    }

    pub(crate) fn save_to(&self, config_path: &Path) -> Result<(), ReplayError> {
        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ReplayError::ConfigIOError { source: e })?;
        }

        let file = File::create(config_path)
            .map_err(|e| ReplayError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| ReplayError::ConfigSerializeError { source: e })?;
        info!("Saved config to {:?}", config_path);
        Ok(())
    }
}
