use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{APP_DIR_NAME, YOLO_MODEL_NAME, YOLO_MODEL_URL};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Shape of the `faceDetectionComplete` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// Faces as a stringified array of stringified objects, wrapped in the
    /// `faces` field. What existing consumers parse.
    #[default]
    Legacy,
    /// Faces as a plain JSON array of objects.
    Structured,
}

/// How detection requests are scheduled off the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExecutionPolicy {
    /// One detached thread per request.
    #[default]
    Detached,
    /// Fixed worker threads draining a bounded queue. A request arriving at a
    /// full queue is failed immediately.
    Pooled {
        workers: usize,
        queue_capacity: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub log_enabled: bool,
    pub payload_shape: PayloadShape,
    pub execution: ExecutionPolicy,
    pub model_name: String,
    pub model_url: String,
    pub bundled_model_dir: Option<PathBuf>,
    /// Fetch the model when it is neither cached nor bundled.
    pub auto_download: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_enabled: false,
            payload_shape: PayloadShape::Legacy,
            execution: ExecutionPolicy::Detached,
            model_name: YOLO_MODEL_NAME.to_string(),
            model_url: YOLO_MODEL_URL.to_string(),
            bundled_model_dir: None,
            auto_download: true,
        }
    }
}

impl BridgeConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    /// Loads `path` if given, otherwise the platform default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::read(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::read(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(!config.log_enabled);
        assert_eq!(config.payload_shape, PayloadShape::Legacy);
        assert_eq!(config.execution, ExecutionPolicy::Detached);
        assert_eq!(config.model_name, YOLO_MODEL_NAME);
        assert!(config.auto_download);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = BridgeConfig::from_json(r#"{"log_enabled": true}"#).unwrap();
        assert!(config.log_enabled);
        assert_eq!(config.payload_shape, PayloadShape::Legacy);
        assert_eq!(config.model_url, YOLO_MODEL_URL);
    }

    #[test]
    fn test_parses_pooled_policy_and_structured_shape() {
        let json = r#"{
            "payload_shape": "structured",
            "execution": {"kind": "pooled", "workers": 3, "queue_capacity": 8}
        }"#;
        let config = BridgeConfig::from_json(json).unwrap();
        assert_eq!(config.payload_shape, PayloadShape::Structured);
        assert_eq!(
            config.execution,
            ExecutionPolicy::Pooled {
                workers: 3,
                queue_capacity: 8
            }
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"auto_download": false, "model_name": "m.onnx"}"#).unwrap();

        let config = BridgeConfig::load(Some(&path)).unwrap();
        assert!(!config.auto_download);
        assert_eq!(config.model_name, "m.onnx");
    }

    #[test]
    fn test_load_missing_explicit_file_errors() {
        let tmp = TempDir::new().unwrap();
        let err = BridgeConfig::load(Some(&tmp.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = BridgeConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
