//! Optional `stepgallery.ron` overrides on top of the built-in defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gallery_engine::CoordinatorConfig;
use gallery_logging::LogDestination;
use log::LevelFilter;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "stepgallery.ron";
const DEFAULT_LOG_PATH: &str = "./stepgallery.log";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogTarget {
    File,
    Terminal,
    Both,
}

/// On-disk shape. Every field is optional; absent fields keep the default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    storage_dir: Option<PathBuf>,
    download_dir: Option<PathBuf>,
    download_batch_size: Option<usize>,
    icon_idle_grace_ms: Option<u64>,
    toast_duration_ms: Option<u64>,
    checkpoint_key: Option<String>,
    settings_key: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    redirect_limit: Option<usize>,
    max_download_bytes: Option<u64>,
    log_level: Option<String>,
    log_target: Option<LogTarget>,
    log_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub coordinator: CoordinatorConfig,
    pub log_level: LevelFilter,
    pub log_destination: LogDestination,
    pub log_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            log_level: LevelFilter::Info,
            log_destination: LogDestination::File,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

/// Result of loading: the config plus a problem to log once logging is up.
pub struct Loaded {
    pub config: AppConfig,
    pub warning: Option<String>,
}

pub fn load(path: &Path) -> Loaded {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Loaded {
                config: AppConfig::default(),
                warning: None,
            };
        }
        Err(err) => {
            return Loaded {
                config: AppConfig::default(),
                warning: Some(format!("Failed to read config {:?}: {}", path, err)),
            };
        }
    };
    parse(&content).unwrap_or_else(|err| Loaded {
        config: AppConfig::default(),
        warning: Some(format!("Failed to parse config {:?}: {}", path, err)),
    })
}

fn parse(content: &str) -> Result<Loaded, ron::error::SpannedError> {
    let file: ConfigFile = ron::from_str(content)?;
    Ok(apply(file))
}

fn apply(file: ConfigFile) -> Loaded {
    let mut config = AppConfig::default();
    let mut warning = None;
    let coordinator = &mut config.coordinator;

    if let Some(dir) = file.storage_dir {
        coordinator.storage_dir = dir;
    }
    if let Some(dir) = file.download_dir {
        coordinator.download_dir = dir;
    }
    if let Some(size) = file.download_batch_size.filter(|size| *size > 0) {
        coordinator.download_batch_size = size;
    }
    if let Some(ms) = file.icon_idle_grace_ms {
        coordinator.icon_idle_grace = Duration::from_millis(ms);
    }
    if let Some(ms) = file.toast_duration_ms {
        coordinator.toast_duration_ms = ms;
    }
    if let Some(key) = file.checkpoint_key {
        coordinator.checkpoint_key = key;
    }
    if let Some(key) = file.settings_key {
        coordinator.settings_key = key;
    }
    if let Some(secs) = file.connect_timeout_secs {
        coordinator.transfer.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.request_timeout_secs {
        coordinator.transfer.request_timeout = Duration::from_secs(secs);
    }
    if let Some(limit) = file.redirect_limit {
        coordinator.transfer.redirect_limit = limit;
    }
    if let Some(bytes) = file.max_download_bytes {
        coordinator.transfer.max_bytes = bytes;
    }

    if let Some(level) = file.log_level {
        match level.parse::<LevelFilter>() {
            Ok(level) => config.log_level = level,
            Err(_) => warning = Some(format!("Unknown log level {:?}, using info", level)),
        }
    }
    if let Some(target) = file.log_target {
        config.log_destination = match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        };
    }
    if let Some(path) = file.log_path {
        config.log_path = path;
    }

    Loaded { config, warning }
}
