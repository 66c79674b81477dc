use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{FaceAuthError, Result};

/// The only environment variable consulted for the backend origin.
pub const API_BASE_URL_ENV: &str = "FACEAUTH_API_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Where camera frames come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraSource {
    #[default]
    Synthetic,
    StillImage {
        path: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
    pub preview_interval_ms: u64,
    pub source: CameraSource,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            facing: FacingMode::User,
            preview_interval_ms: 200,
            source: CameraSource::Synthetic,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
    pub status_history: usize,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            status_history: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FaceAuthConfig {
    pub api: ApiConfig,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub ops: OpsConfig,
}

impl FaceAuthConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            FaceAuthError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            FaceAuthError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    /// Overrides the backend origin from [`API_BASE_URL_ENV`] when it is set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(API_BASE_URL_ENV) {
            let trimmed = base_url.trim();
            if !trimmed.is_empty() {
                self.api.base_url = trimmed.trim_end_matches('/').to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(FaceAuthError::Configuration(
                "api.base_url must not be empty".into(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FaceAuthError::Configuration(
                "api.base_url must start with http:// or https://".into(),
            ));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(FaceAuthError::Configuration(
                "api.request_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return Err(FaceAuthError::Configuration(
                "camera.ideal_width and camera.ideal_height must be greater than zero".into(),
            ));
        }
        if self.camera.preview_interval_ms == 0 {
            return Err(FaceAuthError::Configuration(
                "camera.preview_interval_ms must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(FaceAuthError::Configuration(
                "capture.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if let CameraSource::StillImage { path } = &self.camera.source {
            if path.trim().is_empty() {
                return Err(FaceAuthError::Configuration(
                    "camera.source.path must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}
