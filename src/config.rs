//! Configuration types for the photo-editing server

use crate::error::{EditError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration
    #[serde(rename = "coreml")]
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl std::str::FromStr for ExecutionProvider {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(EditError::invalid_config(format!(
                "Unknown execution provider '{other}'. Expected one of: auto, cpu, cuda, coreml"
            ))),
        }
    }
}

/// Encoded output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// JPEG, for opaque results
    Jpeg,
    /// PNG, when an alpha channel must be preserved
    Png,
}

/// Settings handed to an inference backend at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InferenceConfig {
    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,
    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,
    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,
}

/// Server configuration
///
/// Layered as defaults, then an optional JSON file, then command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,

    /// ONNX file or model directory for background removal (None = disabled)
    pub model_path: Option<PathBuf>,

    /// Inference settings for the segmentation model
    pub inference: InferenceConfig,

    /// Overrides every operation's JPEG quality when set (1-100)
    pub jpeg_quality_override: Option<u8>,

    /// Allow cross-origin requests from any origin
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            max_upload_bytes: 25 * 1024 * 1024,
            model_path: None,
            inference: InferenceConfig::default(),
            jpeg_quality_override: None,
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load a configuration from a JSON file; missing fields keep their defaults
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not valid JSON for this structure
    /// - Loaded values fail validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            EditError::invalid_config(format!(
                "Failed to parse config file '{}': {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Port 0
    /// - Upload limit of 0 bytes
    /// - JPEG quality override outside 1-100
    /// - Host and port that do not form a socket address
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(EditError::config_value_error("port", self.port, "1-65535"));
        }

        if self.max_upload_bytes == 0 {
            return Err(EditError::config_value_error(
                "upload limit",
                self.max_upload_bytes,
                "at least 1 byte",
            ));
        }

        if let Some(quality) = self.jpeg_quality_override {
            if !(1..=100).contains(&quality) {
                return Err(EditError::config_value_error("JPEG quality", quality, "1-100"));
            }
        }

        self.socket_addr()?;
        Ok(())
    }

    /// Socket address built from `host` and `port`
    ///
    /// # Errors
    /// - Host is not an IP address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| EditError::invalid_config(format!("Invalid bind address: {e}")))
    }
}

/// Builder for `ServerConfig`
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Start from an existing configuration, e.g. one loaded from a file
    #[must_use]
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.inference.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.inference.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inference.inter_threads = threads;
        self
    }

    #[must_use]
    pub fn jpeg_quality_override(mut self, quality: u8) -> Self {
        self.config.jpeg_quality_override = Some(quality.clamp(1, 100));
        self
    }

    #[must_use]
    pub fn cors_permissive(mut self, permissive: bool) -> Self {
        self.config.cors_permissive = permissive;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`ServerConfig::validate`]
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 10000);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.model_path.is_none());
        assert!(config.cors_permissive);
    }

    #[test]
    fn test_builder_chain() {
        let config = ServerConfig::builder()
            .host("127.0.0.1")
            .port(8080)
            .model_path("/models/isnet.onnx")
            .execution_provider(ExecutionProvider::Cpu)
            .intra_threads(4)
            .jpeg_quality_override(85)
            .build()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.inference.execution_provider, ExecutionProvider::Cpu);
        assert_eq!(config.inference.intra_threads, 4);
        assert_eq!(config.jpeg_quality_override, Some(85));
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_builder_clamps_quality() {
        let config = ServerConfig::builder().jpeg_quality_override(0).build().unwrap();
        assert_eq!(config.jpeg_quality_override, Some(1));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ServerConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.max_upload_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.jpeg_quality_override = Some(101);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JPEG quality"));

        let mut config = ServerConfig::default();
        config.host = "not a host".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_execution_provider_parsing() {
        assert_eq!("auto".parse::<ExecutionProvider>().unwrap(), ExecutionProvider::Auto);
        assert_eq!("CPU".parse::<ExecutionProvider>().unwrap(), ExecutionProvider::Cpu);
        assert_eq!("coreml".parse::<ExecutionProvider>().unwrap(), ExecutionProvider::CoreMl);
        assert!("tpu".parse::<ExecutionProvider>().is_err());
        assert_eq!(ExecutionProvider::CoreMl.to_string(), "coreml");
    }

    #[test]
    fn test_from_json_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 9000, "inference": {{"execution_provider": "cuda", "intra_threads": 2, "inter_threads": 1}}}}"#
        )
        .unwrap();

        let config = ServerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.inference.execution_provider, ExecutionProvider::Cuda);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "port = 9000").unwrap();
        let err = ServerConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, EditError::InvalidConfig(_)));
    }
}
