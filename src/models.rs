//! Segmentation model discovery and metadata
//!
//! A model is supplied on disk in one of three layouts:
//! - a single `.onnx` file, assumed to be an ISNet-style 1024x1024 model
//! - a `HuggingFace` directory: `config.json`, `preprocessor_config.json`, `onnx/model*.onnx`
//! - a legacy directory: `model.json` with `preprocessing` and `variants`, plus `model_<variant>.onnx`

use crate::config::ExecutionProvider;
use crate::error::{EditError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Input preparation a model expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Square-ish network input as `[height, width]`
    pub target_size: [u32; 2],
    /// Per-channel mean subtracted from `0..=1` RGB
    pub normalization_mean: [f32; 3],
    /// Per-channel divisor applied after the mean
    pub normalization_std: [f32; 3],
}

impl PreprocessingConfig {
    /// ISNet defaults, used for bare `.onnx` files
    #[must_use]
    pub fn isnet() -> Self {
        Self {
            target_size: [1024, 1024],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }
}

/// Model information and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub precision: String,
    pub size_bytes: u64,
    pub input_shape: (usize, usize, usize, usize), // NCHW format
    pub output_shape: (usize, usize, usize, usize),
}

/// Model layout detected on disk
#[derive(Debug, Clone, PartialEq)]
enum ModelFormat {
    SingleFile,
    Legacy,
    HuggingFace,
}

/// Resolved on-disk model plus its parsed configuration
#[derive(Debug, Clone)]
pub struct ModelManager {
    root: PathBuf,
    format: ModelFormat,
    model_config: Value,
    preprocessor_config: Option<Value>,
    variant: String,
}

impl ModelManager {
    /// Resolve a model from a file or directory path
    ///
    /// `provider` picks between fp16 and fp32 variants when both are present.
    ///
    /// # Errors
    /// - Path does not exist
    /// - Directory contains no recognized configuration
    /// - Configuration files are unreadable or invalid JSON
    /// - No ONNX file for any variant
    pub fn from_path<P: AsRef<Path>>(path: P, provider: ExecutionProvider) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.exists() {
            return Err(EditError::model_error_with_context(
                "locate",
                &root,
                "path does not exist",
            ));
        }

        if root.is_file() {
            let is_onnx = root
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));
            if !is_onnx {
                return Err(EditError::model_error_with_context(
                    "load",
                    &root,
                    "expected an .onnx file or a model directory",
                ));
            }
            return Ok(Self {
                root,
                format: ModelFormat::SingleFile,
                model_config: Value::Null,
                preprocessor_config: None,
                variant: "fp32".to_string(),
            });
        }

        match Self::detect_model_format(&root)? {
            ModelFormat::HuggingFace => {
                let model_config = read_json(&root.join("config.json"))?;
                let preprocessor_config = read_json(&root.join("preprocessor_config.json"))?;
                let variant = Self::resolve_huggingface_variant(&root, provider)?;
                Ok(Self {
                    root,
                    format: ModelFormat::HuggingFace,
                    model_config,
                    preprocessor_config: Some(preprocessor_config),
                    variant,
                })
            },
            ModelFormat::Legacy => {
                let model_config = read_json(&root.join("model.json"))?;
                let variant = Self::resolve_legacy_variant(&model_config, provider)?;
                Ok(Self {
                    root,
                    format: ModelFormat::Legacy,
                    model_config,
                    preprocessor_config: None,
                    variant,
                })
            },
            ModelFormat::SingleFile => Err(EditError::internal(
                "directory detected as a single-file model",
            )),
        }
    }

    fn detect_model_format(root: &Path) -> Result<ModelFormat> {
        if root.join("config.json").exists() && root.join("preprocessor_config.json").exists() {
            Ok(ModelFormat::HuggingFace)
        } else if root.join("model.json").exists() {
            Ok(ModelFormat::Legacy)
        } else {
            Err(EditError::model(format!(
                "No valid model configuration found in: {}. Expected either model.json (legacy) or config.json + preprocessor_config.json (HuggingFace)",
                root.display()
            )))
        }
    }

    /// fp16 is preferred on CPU and CUDA, fp32 on `CoreML`
    fn prefer_fp16(provider: ExecutionProvider) -> bool {
        match provider {
            ExecutionProvider::Cpu | ExecutionProvider::Cuda => true,
            ExecutionProvider::CoreMl => false,
            ExecutionProvider::Auto => !cfg!(target_os = "macos"),
        }
    }

    fn pick_variant(available: &[String], provider: ExecutionProvider) -> Option<String> {
        let preferred = if Self::prefer_fp16(provider) {
            ["fp16", "fp32"]
        } else {
            ["fp32", "fp16"]
        };
        preferred
            .iter()
            .find(|v| available.iter().any(|a| a == *v))
            .map(|v| (*v).to_string())
            .or_else(|| available.first().cloned())
    }

    fn resolve_huggingface_variant(root: &Path, provider: ExecutionProvider) -> Result<String> {
        let onnx_dir = root.join("onnx");
        if !onnx_dir.is_dir() {
            return Err(EditError::model(format!(
                "onnx directory not found in HuggingFace model: {}",
                root.display()
            )));
        }

        let mut available = Vec::new();
        for entry in fs::read_dir(&onnx_dir)?.flatten() {
            match entry.file_name().to_str() {
                Some("model.onnx") => available.push("fp32".to_string()),
                Some("model_fp16.onnx") => available.push("fp16".to_string()),
                _ => {},
            }
        }

        Self::pick_variant(&available, provider).ok_or_else(|| {
            EditError::model(format!("No ONNX model files found in: {}", onnx_dir.display()))
        })
    }

    fn resolve_legacy_variant(config: &Value, provider: ExecutionProvider) -> Result<String> {
        for field in ["name", "variants", "preprocessing"] {
            if config.get(field).is_none() {
                return Err(EditError::model(format!(
                    "Missing required field '{field}' in model.json"
                )));
            }
        }
        let available: Vec<String> = config
            .get("variants")
            .and_then(Value::as_object)
            .ok_or_else(|| EditError::model("Field 'variants' must be an object"))?
            .keys()
            .cloned()
            .collect();

        Self::pick_variant(&available, provider)
            .ok_or_else(|| EditError::model("model.json declares no variants"))
    }

    /// Path of the ONNX file that will be loaded
    #[must_use]
    pub fn get_model_path(&self) -> PathBuf {
        match self.format {
            ModelFormat::SingleFile => self.root.clone(),
            ModelFormat::Legacy => self
                .root
                .join(format!("model_{variant}.onnx", variant = self.variant)),
            ModelFormat::HuggingFace => {
                let onnx_dir = self.root.join("onnx");
                match self.variant.as_str() {
                    "fp16" => onnx_dir.join("model_fp16.onnx"),
                    _ => onnx_dir.join("model.onnx"),
                }
            },
        }
    }

    /// Read the model bytes
    ///
    /// # Errors
    /// - Model file missing or unreadable
    pub fn load_model(&self) -> Result<Vec<u8>> {
        let path = self.get_model_path();
        fs::read(&path)
            .map_err(|e| EditError::model_error_with_context("read", &path, &e.to_string()))
    }

    /// Model information
    ///
    /// # Errors
    /// - Model file missing
    /// - Invalid size metadata
    pub fn get_info(&self) -> Result<ModelInfo> {
        let path = self.get_model_path();
        let size_bytes = fs::metadata(&path)
            .map_err(|e| EditError::model_error_with_context("inspect", &path, &e.to_string()))?
            .len();

        let name = match self.format {
            ModelFormat::SingleFile => self
                .root
                .file_stem()
                .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned()),
            ModelFormat::Legacy => format!(
                "{}-{}",
                self.model_config
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown"),
                self.variant
            ),
            ModelFormat::HuggingFace => format!(
                "{}-{}",
                self.model_config
                    .get("model_type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown"),
                self.variant
            ),
        };

        let [height, width] = self.get_preprocessing_config()?.target_size;
        let (height, width) = (height as usize, width as usize);
        Ok(ModelInfo {
            name,
            precision: self.variant.clone(),
            size_bytes,
            input_shape: (1, 3, height, width),
            output_shape: (1, 1, height, width),
        })
    }

    /// Preprocessing the model expects
    ///
    /// # Errors
    /// - Missing or malformed size and normalization entries
    pub fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        match self.format {
            ModelFormat::SingleFile => Ok(PreprocessingConfig::isnet()),
            ModelFormat::Legacy => {
                let preprocessing = self
                    .model_config
                    .get("preprocessing")
                    .ok_or_else(|| EditError::model("Missing preprocessing config"))?;
                Ok(PreprocessingConfig {
                    target_size: parse_target_size_legacy(preprocessing)?,
                    normalization_mean: parse_triplet(
                        preprocessing.get("normalization").and_then(|n| n.get("mean")),
                        "normalization mean",
                        1.0,
                    )?,
                    normalization_std: parse_triplet(
                        preprocessing.get("normalization").and_then(|n| n.get("std")),
                        "normalization std",
                        1.0,
                    )?,
                })
            },
            ModelFormat::HuggingFace => {
                let preprocessor = self.preprocessor_config.as_ref().ok_or_else(|| {
                    EditError::model("Missing preprocessor config for HuggingFace model")
                })?;
                // HuggingFace stores mean and std on the 0-255 scale
                Ok(PreprocessingConfig {
                    target_size: parse_target_size_huggingface(preprocessor)?,
                    normalization_mean: parse_triplet(
                        preprocessor.get("image_mean"),
                        "image_mean",
                        255.0,
                    )?,
                    normalization_std: parse_triplet(
                        preprocessor.get("image_std"),
                        "image_std",
                        255.0,
                    )?,
                })
            },
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| EditError::model_error_with_context("read config of", path, &e.to_string()))?;
    serde_json::from_str(&content)
        .map_err(|e| EditError::model_error_with_context("parse config of", path, &e.to_string()))
}

fn to_u32(value: Option<u64>, what: &str) -> Result<u32> {
    let raw = value.ok_or_else(|| EditError::model(format!("Missing {what} in preprocessing config")))?;
    u32::try_from(raw).map_err(|_| EditError::model(format!("{what} too large for u32")))
}

fn parse_target_size_legacy(preprocessing: &Value) -> Result<[u32; 2]> {
    let size = preprocessing.get("target_size");
    Ok([
        to_u32(size.and_then(|s| s.get(0)).and_then(Value::as_u64), "target_size[0]")?,
        to_u32(size.and_then(|s| s.get(1)).and_then(Value::as_u64), "target_size[1]")?,
    ])
}

fn parse_target_size_huggingface(preprocessor: &Value) -> Result<[u32; 2]> {
    let size = preprocessor
        .get("size")
        .ok_or_else(|| EditError::model("Missing size in preprocessor config"))?;
    Ok([
        to_u32(size.get("height").and_then(Value::as_u64), "height")?,
        to_u32(size.get("width").and_then(Value::as_u64), "width")?,
    ])
}

fn parse_triplet(values: Option<&Value>, what: &str, scale: f64) -> Result<[f32; 3]> {
    let values = values
        .and_then(Value::as_array)
        .ok_or_else(|| EditError::model(format!("Missing {what} in preprocessing config")))?;
    if values.len() < 3 {
        return Err(EditError::model(format!("{what} must have at least 3 values")));
    }
    let mut out = [0.0_f32; 3];
    for (slot, value) in out.iter_mut().zip(values) {
        let v = value
            .as_f64()
            .ok_or_else(|| EditError::model(format!("Invalid {what} value: {value}")))?;
        *slot = (v / scale) as f32;
    }
    Ok(out)
}
