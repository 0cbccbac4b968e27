//! Error taxonomy, status mapping, and failure paths

mod common;

use axum::http::StatusCode;
use common::{gradient, png_bytes};
use photoedit::server::ApiError;
use photoedit::{
    dispatch, DispatchContext, EditError, ForegroundProcessor, InferenceConfig, MockBackend,
    Operation, OperationParameters, ServerConfig,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_client_and_server_classes() {
    let client = [
        EditError::missing_input("no image provided"),
        EditError::invalid_parameter("contrast", "high", "number"),
        EditError::decode("unknown format"),
    ];
    for err in client {
        assert!(err.is_client_error(), "{err}");
        assert_eq!(ApiError::from(err).status(), StatusCode::BAD_REQUEST);
    }

    let server = [
        EditError::processing("blend size mismatch"),
        EditError::inference("session failed"),
        EditError::model("not configured"),
        EditError::invalid_config("port 0"),
        EditError::internal("task panicked"),
        EditError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
    ];
    for err in server {
        assert!(!err.is_client_error(), "{err}");
        assert_eq!(ApiError::from(err).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

#[test]
fn test_api_error_keeps_message() {
    let err = ApiError::from(EditError::invalid_parameter("rotate", "left", "number"));
    assert_eq!(
        err.message(),
        "Invalid parameter 'rotate': 'left' is not a valid number"
    );
}

#[test]
fn test_non_finite_parameters_rejected() {
    let upload = png_bytes(&gradient(8, 8));
    for value in ["NaN", "inf", "-inf", "1.0.0", "90deg"] {
        let params = OperationParameters::new().with("rotate", value);
        let err = dispatch(
            Operation::ManualEdit,
            &upload,
            &params,
            &DispatchContext::default(),
        )
        .unwrap_err();
        assert!(
            matches!(err, EditError::InvalidParameter { ref name, .. } if name == "rotate"),
            "{value}: {err:?}"
        );
    }
}

#[test]
fn test_blank_parameters_use_defaults() {
    let upload = png_bytes(&gradient(8, 8));
    let params = OperationParameters::new()
        .with("brightness", "   ")
        .with("rotate", "");
    assert!(dispatch(
        Operation::ManualEdit,
        &upload,
        &params,
        &DispatchContext::default()
    )
    .is_ok());
}

#[test]
fn test_parameters_checked_before_decoding() {
    let params = OperationParameters::new().with("sharpness", "very");
    let err = dispatch(
        Operation::ManualEdit,
        b"not an image",
        &params,
        &DispatchContext::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EditError::InvalidParameter { .. }));
}

#[test]
fn test_truncated_upload_is_decode_error() {
    let mut upload = png_bytes(&gradient(32, 32));
    upload.truncate(upload.len() / 2);
    let err = dispatch(
        Operation::ColorBoost,
        &upload,
        &OperationParameters::new(),
        &DispatchContext::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EditError::Decode(_)), "{err:?}");
}

#[test]
fn test_inference_failure_is_server_error() {
    let processor = ForegroundProcessor::new(
        Box::new(MockBackend::new_failing_inference()),
        &InferenceConfig::default(),
    )
    .unwrap();
    let context = DispatchContext {
        foreground: Some(Arc::new(processor)),
        jpeg_quality_override: None,
    };
    for operation in [Operation::RemoveBackground, Operation::SkyReplace] {
        let err = dispatch(
            operation,
            &png_bytes(&gradient(16, 16)),
            &OperationParameters::new(),
            &context,
        )
        .unwrap_err();
        assert!(matches!(err, EditError::Inference(_)), "{err:?}");
        assert_eq!(err.status_code(), 500);
    }
}

#[test]
fn test_backend_init_failure_is_model_error() {
    let err = ForegroundProcessor::new(
        Box::new(MockBackend::new_failing_init()),
        &InferenceConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EditError::Model(_)));
}

#[test]
fn test_missing_model_path() {
    let err = ForegroundProcessor::from_model_path(
        "/nonexistent/models/isnet.onnx",
        &InferenceConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EditError::Model(_)));
    assert!(err.to_string().contains("/nonexistent/models/isnet.onnx"));
}

#[test]
fn test_config_file_errors() {
    let dir = TempDir::new().unwrap();

    let missing = ServerConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, EditError::Io(_)));

    let malformed_path = dir.path().join("malformed.json");
    std::fs::File::create(&malformed_path)
        .unwrap()
        .write_all(b"{ port: ")
        .unwrap();
    let malformed = ServerConfig::from_json_file(&malformed_path).unwrap_err();
    assert!(matches!(malformed, EditError::InvalidConfig(_)));

    let invalid_path = dir.path().join("invalid.json");
    std::fs::write(&invalid_path, r#"{"jpeg_quality_override": 0}"#).unwrap();
    let invalid = ServerConfig::from_json_file(&invalid_path).unwrap_err();
    assert!(invalid.to_string().contains("JPEG quality"));
}

#[test]
fn test_partial_config_file_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.json");
    std::fs::write(&path, r#"{"port": 8088, "inference": {"execution_provider": "cpu"}}"#)
        .unwrap();

    let config = ServerConfig::from_json_file(&path).unwrap();
    assert_eq!(config.port, 8088);
    assert_eq!(config.inference.execution_provider, photoedit::ExecutionProvider::Cpu);
    assert_eq!(config.inference.intra_threads, 0);
    assert_eq!(config.host, ServerConfig::default().host);
    assert_eq!(config.max_upload_bytes, ServerConfig::default().max_upload_bytes);
}
