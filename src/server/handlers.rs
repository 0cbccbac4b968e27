//! Request handlers

use super::error::ApiError;
use super::AppState;
use crate::error::EditError;
use crate::operations::{dispatch, Operation, OPERATIONS};
use crate::params::OperationParameters;
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Form field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

/// A decoded multipart request
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<Bytes>,
    pub params: OperationParameters,
}

impl UploadForm {
    /// Collect the `image` field and every other field as a text parameter
    ///
    /// # Errors
    /// - Malformed multipart framing or a non-UTF-8 text field
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == IMAGE_FIELD {
                form.image = Some(field.bytes().await?);
            } else {
                let value = field.text().await?;
                form.params.insert(name, value);
            }
        }
        Ok(form)
    }
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub status: &'static str,
    pub operations: Vec<&'static str>,
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "Photo Editor backend running",
        operations: OPERATIONS.iter().map(|spec| spec.name).collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub background_removal: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        background_removal: state.context.foreground.is_some(),
    })
}

/// Run one operation on the uploaded image
///
/// The pipeline runs on the blocking pool; the response body is the encoded
/// image with its `Content-Type`.
pub async fn process(
    operation: Operation,
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let form = UploadForm::from_multipart(multipart?).await?;
    let image = form
        .image
        .ok_or_else(|| EditError::missing_input("no image provided"))?;
    debug!(
        operation = operation.name(),
        upload_bytes = image.len(),
        params = form.params.len(),
        "dispatching"
    );

    let context = Arc::clone(&state.context);
    let params = form.params;
    let processed =
        tokio::task::spawn_blocking(move || dispatch(operation, &image, &params, &context))
            .await
            .map_err(|e| EditError::internal(format!("Processing task failed: {e}")))??;

    Ok(([(header::CONTENT_TYPE, processed.content_type())], processed.bytes).into_response())
}
