//! Segmentation backend implementations
//!
//! - ONNX Runtime backend (feature `onnx`), CPU or GPU accelerated
//! - Mock backend, a deterministic soft disc for tests and model-less runs

pub mod mock;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use self::mock::MockBackend;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;
