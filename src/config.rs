//! Configuration file support
//!
//! Settings are read from TOML, first found wins:
//!
//! 1. `./mailslicer.toml`
//! 2. `<config dir>/mailslicer/config.toml` (e.g. `~/.config/mailslicer/config.toml`)
//!
//! Command line flags override file values through [`CliOverrides`].
//!
//! ```toml
//! [segment]
//! half_window = 8
//! brightness_threshold = 235.0
//! min_band_height = 12
//!
//! [render]
//! max_width = 700
//!
//! [render.style]
//! cta_label = "Saiba mais"
//!
//! [ocr]
//! enabled = true
//! languages = "por+eng"
//!
//! [server]
//! port = 3000
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ocr::TesseractOptions;
use crate::pipeline::{PipelineConfig, DEFAULT_MAX_WIDTH};
use crate::render::EmailStyle;
use crate::segment::SegmentOptions;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "mailslicer.toml";

/// Directory name under the user config dir
const CONFIG_DIR_NAME: &str = "mailslicer";

/// Default web server port
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default web server bind address
pub const DEFAULT_SERVER_BIND: &str = "127.0.0.1";

/// Default upload limit in megabytes
pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 50;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Invalid config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// File sections
// ============================================================

/// `[render]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum prepared image width (0 = keep original)
    pub max_width: u32,
    /// Write a debug overlay next to the HTML
    pub save_debug: bool,
    /// Text row and button styling
    pub style: EmailStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            save_debug: false,
            style: EmailStyle::default(),
        }
    }
}

/// `[ocr]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run text recognition
    pub enabled: bool,
    #[serde(flatten)]
    pub tesseract: TesseractOptions,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract: TesseractOptions::default(),
        }
    }
}

/// `[server]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
    pub bind: String,
    /// Upload limit in megabytes
    pub upload_limit_mb: usize,
    /// Root directory for job outputs
    pub work_dir: PathBuf,
    /// Directory holding `<template_id>.html` files
    pub templates_dir: PathBuf,
    /// Concurrent builds (None = number of CPUs)
    pub workers: Option<usize>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            bind: DEFAULT_SERVER_BIND.to_string(),
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
            work_dir: PathBuf::from("data"),
            templates_dir: PathBuf::from("templates"),
            workers: None,
        }
    }
}

// ============================================================
// Config
// ============================================================

/// Contents of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segment: SegmentOptions,
    pub render: RenderConfig,
    pub ocr: OcrConfig,
    pub server: ServerSection,
}

impl Config {
    /// Candidate config file locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    /// Load the first config file found, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a specific config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve the pipeline configuration, flags taking precedence
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> PipelineConfig {
        let file = &self.segment;
        let segment = SegmentOptions::builder()
            .half_window(cli.half_window.unwrap_or(file.half_window))
            .brightness_threshold(cli.brightness_threshold.unwrap_or(file.brightness_threshold))
            .flatness_threshold(cli.flatness_threshold.unwrap_or(file.flatness_threshold))
            .safety_margin(cli.safety_margin.unwrap_or(file.safety_margin))
            .min_band_height(cli.min_band_height.unwrap_or(file.min_band_height))
            .build();

        let mut tesseract = self.ocr.tesseract.clone();
        if let Some(langs) = &cli.ocr_languages {
            tesseract.languages = langs.clone();
        }

        PipelineConfig {
            segment,
            max_width: cli.max_width.unwrap_or(self.render.max_width),
            ocr: cli.ocr.unwrap_or(self.ocr.enabled),
            tesseract,
            style: self.render.style.clone(),
            save_debug: cli.save_debug.unwrap_or(self.render.save_debug),
        }
    }
}

/// Values given on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub half_window: Option<u32>,
    pub brightness_threshold: Option<f64>,
    pub flatness_threshold: Option<f64>,
    pub safety_margin: Option<u32>,
    pub min_band_height: Option<u32>,
    pub max_width: Option<u32>,
    pub ocr: Option<bool>,
    pub ocr_languages: Option<String>,
    pub save_debug: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrGranularity;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.render.max_width, 700);
        assert!(config.ocr.enabled);
        assert_eq!(config.ocr.tesseract.languages, "por+eng");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.segment, SegmentOptions::default());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml(
            r#"
[segment]
min_band_height = 20

[render]
max_width = 600

[render.style]
cta_label = "Compre agora"

[ocr]
enabled = false
languages = "eng"
granularity = "line"
"#,
        )
        .unwrap();

        assert_eq!(config.segment.min_band_height, 20);
        assert_eq!(config.segment.half_window, 8);
        assert_eq!(config.render.max_width, 600);
        assert_eq!(config.render.style.cta_label, "Compre agora");
        assert_eq!(config.render.style.cta_background, "#D22E2D");
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.tesseract.languages, "eng");
        assert_eq!(config.ocr.tesseract.granularity, OcrGranularity::Line);
        assert_eq!(config.ocr.tesseract.timeout_secs, 120);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(Config::from_toml("[segment\nhalf_window = ").is_err());
    }

    #[test]
    fn test_load_from_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mailslicer.toml");
        std::fs::write(&path, "[server]\nport = 8080\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "127.0.0.1");
    }

    #[test]
    fn test_load_from_missing_path() {
        let result = Config::load_from_path(Path::new("/nonexistent/mailslicer.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "render = 3 = 4").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse(_, _))
        ));
    }

    #[test]
    fn test_search_paths_start_local() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from("mailslicer.toml"));
    }

    #[test]
    fn test_merge_without_overrides_keeps_file_values() {
        let mut config = Config::default();
        config.segment.safety_margin = 10;
        config.render.save_debug = true;

        let merged = config.merge_with_cli(&CliOverrides::new());
        assert_eq!(merged.segment.safety_margin, 10);
        assert!(merged.save_debug);
        assert_eq!(merged.max_width, 700);
        assert!(merged.ocr);
    }

    #[test]
    fn test_merge_cli_takes_precedence() {
        let config = Config::default();
        let overrides = CliOverrides {
            half_window: Some(4),
            brightness_threshold: Some(400.0),
            min_band_height: Some(30),
            max_width: Some(500),
            ocr: Some(false),
            ocr_languages: Some("eng".to_string()),
            ..Default::default()
        };

        let merged = config.merge_with_cli(&overrides);
        assert_eq!(merged.segment.half_window, 4);
        assert_eq!(merged.segment.brightness_threshold, 255.0);
        assert_eq!(merged.segment.min_band_height, 30);
        assert_eq!(merged.max_width, 500);
        assert!(!merged.ocr);
        assert_eq!(merged.tesseract.languages, "eng");
    }

    #[test]
    fn test_file_thresholds_are_clamped() {
        let config = Config::from_toml(
            "[segment]\nbrightness_threshold = 300.0\nflatness_threshold = -5.0\n",
        )
        .unwrap();

        let merged = config.merge_with_cli(&CliOverrides::new());
        assert_eq!(merged.segment.brightness_threshold, 255.0);
        assert_eq!(merged.segment.flatness_threshold, 0.0);
    }
}
