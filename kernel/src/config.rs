// Picker Configuration
//
// Where records are stored and how acquired images are normalized.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::gallery::layout::Size;
use crate::gallery::GallerySettings;
use crate::store::FileBackend;

/// Configuration loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Name of the backing file inside `data_dir`.
    pub filename: String,

    /// Application-private directory holding the backing file.
    pub data_dir: PathBuf,

    /// Images are fitted inside these bounds, keeping their aspect ratio.
    pub bounds: Size,

    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("filename must be a bare file name, got `{0}`")]
    Filename(String),

    #[error("bounds must be non-empty, got {width}x{height}")]
    Bounds { width: u32, height: u32 },

    #[error("jpeg quality must be within 1..=100, got {0}")]
    Quality(u8),
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl PickerConfig {
    /// Built-in configuration (used if no config file is provided).
    pub fn default_config() -> Self {
        Self {
            filename: "images.json".into(),
            data_dir: PathBuf::from("picker-data"),
            bounds: Size::new(390, 844),
            jpeg_quality: 100,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if FileBackend::in_dir(&self.data_dir, &self.filename).is_none() {
            return Err(ConfigError::Filename(self.filename.clone()));
        }
        if self.bounds.is_empty() {
            return Err(ConfigError::Bounds {
                width: self.bounds.width,
                height: self.bounds.height,
            });
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Quality(self.jpeg_quality));
        }
        Ok(())
    }

    pub fn gallery_settings(&self) -> GallerySettings {
        GallerySettings {
            bounds: self.bounds,
            quality: self.jpeg_quality,
        }
    }
}
