//! Configuration management for camera sessions
//!
//! Default capture parameters, still-capture output settings and the camera
//! thread name, loaded from and saved to TOML.

use crate::errors::CameraError;
use crate::session::SessionOptions;
use crate::types::Size;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSessionConfig {
    pub capture: CaptureConfig,
    pub still: StillConfig,
    pub thread: ThreadConfig,
}

/// Capture parameters used when the caller does not supply any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    /// Whole frames per second
    pub fps: u32,
}

/// Still-capture output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StillConfig {
    /// Add a still-capture output to every session
    pub enabled: bool,
    /// Images the still reader may hold at once
    pub max_images: u32,
    /// Used when the device exposes no still-size list [width, height]
    pub fallback_size: [u32; 2],
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadConfig {
    pub name: String,
}

impl Default for CameraSessionConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                width: 1280,
                height: 720,
                fps: 30,
            },
            still: StillConfig {
                enabled: true,
                max_images: 2,
                fallback_size: [1920, 1080],
                jpeg_quality: 95,
            },
            thread: ThreadConfig {
                name: "camera-thread".to_string(),
            },
        }
    }
}

impl CameraSessionConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: CameraSessionConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("camera2-session.toml")
    }

    /// Load from default location, falling back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CameraError> {
        let invalid = |msg: &str| Err(CameraError::ConfigError(msg.to_string()));

        if self.capture.width == 0 || self.capture.height == 0 {
            return invalid("Invalid capture size");
        }
        if self.capture.fps == 0 || self.capture.fps > 240 {
            return invalid("Invalid capture FPS (must be 1-240)");
        }

        if self.still.max_images == 0 {
            return invalid("Still max_images must be at least 1");
        }
        if self.still.fallback_size[0] == 0 || self.still.fallback_size[1] == 0 {
            return invalid("Invalid still fallback size");
        }
        if self.still.jpeg_quality == 0 || self.still.jpeg_quality > 100 {
            return invalid("JPEG quality must be between 1 and 100");
        }

        if self.thread.name.trim().is_empty() {
            return invalid("Camera thread name must not be empty");
        }

        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            still_capture: self.still.enabled,
            still_max_images: self.still.max_images,
            still_fallback_size: Size::new(
                self.still.fallback_size[0],
                self.still.fallback_size[1],
            ),
            jpeg_quality: self.still.jpeg_quality,
        }
    }
}
