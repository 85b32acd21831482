use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{diagnosis::ResolveError, model::ModelError, preprocess::DecodeError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Model is not available")]
    ModelUnavailable,
    #[error("No file part in the request")]
    NoFileProvided,
    #[error("No selected file")]
    EmptyFilename,
    #[error("Invalid file type. Please upload a .png, .jpg, or .jpeg")]
    UnsupportedExtension,
    #[error("Unsupported content type. Please use form data with image file.")]
    UnsupportedContentType,
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("An internal error occurred: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("An internal error occurred: {0}")]
    Model(#[from] ModelError),
    #[error("An internal error occurred: {0}")]
    Internal(String),
}

impl AppError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoFileProvided
            | Self::EmptyFilename
            | Self::UnsupportedExtension
            | Self::UnsupportedContentType
            | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::ModelUnavailable
            | Self::Decode(_)
            | Self::Resolve(_)
            | Self::Model(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!("{}", message);
        } else {
            tracing::warn!("Rejected request: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
