//! Application configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Named path templates, keyed by template name.
    ///
    /// Insertion order is preserved for preset matching, so this is a
    /// BTreeMap only at rest; the runtime registry keeps declaration order.
    pub templates: BTreeMap<String, String>,

    /// Export presets available to the session.
    pub presets: Vec<PresetConfig>,

    /// Task template assigned to newly created Shots, if any.
    #[serde(default)]
    pub task_template: Option<String>,

    /// Background job queue settings.
    pub backburner: BackburnerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Directory for generated per-app-instance cache files.
    pub cache_dir: PathBuf,

    /// Shared temp directory reachable by render nodes.
    pub shared_tmp_dir: PathBuf,
}

/// One configured export preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetConfig {
    /// Preset name shown to the user.
    pub name: String,

    /// Template for rendered frames.
    pub render_template: String,

    /// Template for the exported batch setup file.
    pub batch_template: String,

    /// Template for batch-rendered frames.
    pub batch_render_template: String,

    /// Template for review quicktimes.
    pub quicktime_template: String,

    /// Template for batch-mode quicktimes.
    pub batch_quicktime_template: String,

    /// Template for per-shot open clip files.
    pub shot_clip_template: String,

    /// Template for per-segment open clip files.
    pub segment_clip_template: String,

    /// Handle frames rendered beyond the cut in/out points.
    pub handle_length: i64,

    /// Cut type label stamped on created Cut records.
    #[serde(default)]
    pub cut_type: String,

    /// Upload review quicktimes to the tracking database.
    #[serde(default = "default_true")]
    pub upload_quicktime: bool,

    /// Generate an additional high-resolution quicktime per Version.
    #[serde(default)]
    pub highres_quicktime: bool,
}

fn default_true() -> bool {
    true
}

/// Background job queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackburnerConfig {
    /// Path to the queue submission binary.
    pub binary: PathBuf,

    /// Queue manager host, if pinned by configuration.
    #[serde(default)]
    pub manager: Option<String>,

    /// Server group to restrict job placement to.
    #[serde(default)]
    pub server_group: Option<String>,

    /// Queue protocol version; gates the local default-manager query.
    pub protocol_version: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cutsync=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            templates: BTreeMap::new(),
            presets: vec![],
            task_template: None,
            backburner: BackburnerConfig::default(),
            logging: LoggingConfig::default(),
            cache_dir: dirs_default_cache(),
            shared_tmp_dir: PathBuf::from("/tmp"),
        }
    }
}

impl Default for BackburnerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("cmdjob"),
            manager: None,
            server_group: None,
            protocol_version: 2017,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl BackburnerConfig {
    /// Whether the queue protocol supports querying the local default manager.
    pub fn supports_manager_query(&self) -> bool {
        self.protocol_version >= 2017
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cutsync").join("config.json")
}

/// Default cache directory.
fn dirs_default_cache() -> PathBuf {
    let base = std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".cache")
        });
    base.join("cutsync")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = AppConfig::default();
        assert!(config.presets.is_empty());
        assert_eq!(config.backburner.binary, PathBuf::from("cmdjob"));
        assert!(config.backburner.supports_manager_query());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_preset_config_round_trip() {
        let preset = PresetConfig {
            name: "Shot Export".to_string(),
            render_template: "flame_render".to_string(),
            batch_template: "flame_batch".to_string(),
            batch_render_template: "flame_batch_render".to_string(),
            quicktime_template: "flame_quicktime".to_string(),
            batch_quicktime_template: "flame_batch_quicktime".to_string(),
            shot_clip_template: "flame_shot_clip".to_string(),
            segment_clip_template: "flame_segment_clip".to_string(),
            handle_length: 10,
            cut_type: "Conform".to_string(),
            upload_quicktime: true,
            highres_quicktime: false,
        };
        let json = serde_json::to_string(&preset).unwrap();
        let parsed: PresetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "Shot Export");
        assert_eq!(parsed.handle_length, 10);
    }

    #[test]
    fn test_preset_toggles_default_when_absent() {
        let json = r#"{
            "name": "Minimal",
            "render_template": "r",
            "batch_template": "bt",
            "batch_render_template": "b",
            "quicktime_template": "q",
            "batch_quicktime_template": "bq",
            "shot_clip_template": "sc",
            "segment_clip_template": "gc",
            "handle_length": 8
        }"#;
        let parsed: PresetConfig = serde_json::from_str(json).unwrap();
        assert!(parsed.upload_quicktime);
        assert!(!parsed.highres_quicktime);
        assert_eq!(parsed.cut_type, "");
    }
}
