// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Exchange settings, optionally loaded from a `handlink.yaml` file.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use handlink_ipc_types::{RegionLayout, DEFAULT_NUM_LANDMARKS};
use serde::{Deserialize, Serialize};

use crate::core::{HandlinkError, Result};

/// Which detector variant feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Plain pixel buffers handed to the graph.
    #[default]
    Cpu,
    /// Texture upload / readback inside a graphics-context scope.
    Gpu,
}

impl Backend {
    /// Landmark stream name the stock graphs use for this backend.
    pub fn default_landmark_stream(self) -> &'static str {
        match self {
            Backend::Cpu => "landmarks",
            Backend::Gpu => "hand_landmarks",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Cpu => f.write_str("cpu"),
            Backend::Gpu => f.write_str("gpu"),
        }
    }
}

impl FromStr for Backend {
    type Err = HandlinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Backend::Cpu),
            "gpu" => Ok(Backend::Gpu),
            other => Err(HandlinkError::Configuration(format!(
                "Unknown backend '{}' (expected 'cpu' or 'gpu')",
                other
            ))),
        }
    }
}

/// Settings shared by every component of one exchange.
///
/// Both processes must load the same settings: the landmark count and the
/// region name decide where the consumer looks for its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlinkConfig {
    /// Graph input stream carrying the frames.
    pub input_stream: String,
    /// Pollable image output stream.
    pub output_stream: String,
    /// Observed landmark stream. Falls back to the backend's default.
    pub landmark_stream: Option<String>,
    /// Points per hand written to the coordinate block.
    pub num_landmarks: usize,
    /// Name of the shared-memory segment.
    pub region_name: String,
    /// Trailing argument that marks the consumer role.
    pub child_marker: String,
    /// How long the consumer waits for the landmark observer, in milliseconds.
    pub landmark_wait_ms: u64,
    pub backend: Backend,
}

impl Default for HandlinkConfig {
    fn default() -> Self {
        Self {
            input_stream: "input_video".to_string(),
            output_stream: "output_video".to_string(),
            landmark_stream: None,
            num_landmarks: DEFAULT_NUM_LANDMARKS,
            region_name: "MySharedMemory".to_string(),
            child_marker: "child".to_string(),
            landmark_wait_ms: 500,
            backend: Backend::Cpu,
        }
    }
}

impl HandlinkConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "handlink.yaml";

    /// Load settings from a YAML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HandlinkError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                HandlinkError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
            })?
        };
        config.validate()?;

        tracing::info!("Loaded handlink config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                tracing::debug!("No settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_landmarks == 0 {
            return Err(HandlinkError::Configuration(
                "num_landmarks must be greater than zero".to_string(),
            ));
        }
        for (field, value) in [
            ("input_stream", &self.input_stream),
            ("output_stream", &self.output_stream),
            ("region_name", &self.region_name),
            ("child_marker", &self.child_marker),
        ] {
            if value.trim().is_empty() {
                return Err(HandlinkError::Configuration(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Landmark stream for the configured backend.
    pub fn landmark_stream(&self) -> &str {
        self.landmark_stream
            .as_deref()
            .unwrap_or_else(|| self.backend.default_landmark_stream())
    }

    pub fn landmark_wait(&self) -> Duration {
        Duration::from_millis(self.landmark_wait_ms)
    }

    /// Region layout for a `cols x rows` image under these settings.
    pub fn region_layout(&self, cols: u32, rows: u32) -> Result<RegionLayout> {
        Ok(RegionLayout::new(self.num_landmarks, cols, rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_stock_graph() {
        let config = HandlinkConfig::default();
        assert_eq!(config.input_stream, "input_video");
        assert_eq!(config.output_stream, "output_video");
        assert_eq!(config.num_landmarks, 21);
        assert_eq!(config.landmark_stream(), "landmarks");
    }

    #[test]
    fn test_landmark_stream_follows_backend() {
        let config = HandlinkConfig {
            backend: Backend::Gpu,
            ..Default::default()
        };
        assert_eq!(config.landmark_stream(), "hand_landmarks");

        let config = HandlinkConfig {
            backend: Backend::Gpu,
            landmark_stream: Some("multi_hand_landmarks".to_string()),
            ..Default::default()
        };
        assert_eq!(config.landmark_stream(), "multi_hand_landmarks");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(HandlinkConfig::FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
region_name: test-region
backend: gpu
num_landmarks: 5
"#
        )
        .unwrap();

        let config = HandlinkConfig::load(&path).unwrap();
        assert_eq!(config.region_name, "test-region");
        assert_eq!(config.backend, Backend::Gpu);
        assert_eq!(config.num_landmarks, 5);
        assert_eq!(config.input_stream, "input_video");
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(HandlinkConfig::FILE_NAME);
        std::fs::write(&path, "").unwrap();

        assert_eq!(HandlinkConfig::load(&path).unwrap(), HandlinkConfig::default());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(HandlinkConfig::FILE_NAME);
        std::fs::write(&path, "backend: tpu\n").unwrap();

        assert!(matches!(
            HandlinkConfig::load(&path),
            Err(HandlinkError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_landmarks_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(HandlinkConfig::FILE_NAME);
        std::fs::write(&path, "num_landmarks: 0\n").unwrap();

        assert!(HandlinkConfig::load(&path).is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("GPU".parse::<Backend>().unwrap(), Backend::Gpu);
        assert_eq!("cpu".parse::<Backend>().unwrap(), Backend::Cpu);
        assert!("metal".parse::<Backend>().is_err());
    }
}
