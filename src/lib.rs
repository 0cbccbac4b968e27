#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Photo Editor Backend
//!
//! A stateless photo-editing service. A client uploads one image and picks an
//! operation; the server runs a fixed pipeline of classic image filters (and,
//! for some operations, a foreground segmentation model) and answers with the
//! encoded result.
//!
//! ## Features
//!
//! - **Fifteen operations**: manual edits, auto enhancement, retouching, HDR,
//!   relighting, cartoon, depth focus, sky replacement and more
//! - **Background removal**: ONNX Runtime segmentation (`ISNet` style models)
//!   with CUDA, `CoreML`, and CPU execution providers
//! - **HTTP server**: one multipart `POST` route per operation (enable with `cli`)
//! - **Library use**: every pipeline is a plain function over `image` buffers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photoedit::{process_bytes, Operation, OperationParameters};
//!
//! # fn example(upload: Vec<u8>) -> photoedit::Result<()> {
//! let params = OperationParameters::new()
//!     .with("brightness", "1.2")
//!     .with("rotate", "90");
//! let edited = process_bytes(Operation::ManualEdit, &upload, &params)?;
//! assert_eq!(edited.content_type(), "image/jpeg");
//! # Ok(())
//! # }
//! ```
//!
//! Operations that need segmentation take a [`ForegroundProcessor`] through a
//! [`DispatchContext`]:
//!
//! ```rust,no_run
//! use photoedit::{dispatch, DispatchContext, ForegroundProcessor, InferenceConfig};
//! use photoedit::{Operation, OperationParameters};
//! use std::sync::Arc;
//!
//! # fn example(upload: Vec<u8>) -> photoedit::Result<()> {
//! let processor = ForegroundProcessor::from_model_path("models/isnet.onnx", &InferenceConfig::default())?;
//! let context = DispatchContext {
//!     foreground: Some(Arc::new(processor)),
//!     jpeg_quality_override: None,
//! };
//! let cutout = dispatch(Operation::RemoveBackground, &upload, &OperationParameters::new(), &context)?;
//! assert_eq!(cutout.content_type(), "image/png");
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime segmentation backend
//! - `cli` (default): server command line and subscriber setup
//! - `webp-support` (default): WebP uploads
//! - `tracing-json`: JSON log output for the server

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod imaging;
pub mod inference;
pub mod models;
pub mod operations;
pub mod params;
pub mod presets;
pub mod processor;
pub mod server;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use config::{
    ExecutionProvider, InferenceConfig, OutputFormat, ServerConfig, ServerConfigBuilder,
};
pub use error::{EditError, Result};
pub use inference::InferenceBackend;
pub use models::{ModelInfo, ModelManager, PreprocessingConfig};
pub use operations::{dispatch, DispatchContext, Operation, OperationSpec, OPERATIONS};
pub use params::{ManualEditParams, OperationParameters, SkyMode, SkyMood};
pub use processor::ForegroundProcessor;
pub use server::{create_router, serve, AppState};
pub use services::{ImageIOService, OutputFormatHandler};
pub use types::{ProcessedImage, SegmentationMask};
pub use utils::{ImagePreprocessor, Letterbox, PreprocessingOptions};

#[cfg(feature = "cli")]
pub use tracing_config::{init_server_tracing, TracingConfig, TracingFormat};

/// Run one operation on encoded image bytes without a segmentation model
///
/// Background removal and sky replacement fail with [`EditError::Model`];
/// use [`dispatch`] with a [`DispatchContext`] holding a
/// [`ForegroundProcessor`] for those.
pub fn process_bytes(
    operation: Operation,
    image_bytes: &[u8],
    params: &OperationParameters,
) -> Result<ProcessedImage> {
    dispatch(operation, image_bytes, params, &DispatchContext::default())
}
