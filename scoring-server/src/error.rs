//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::classifier::ClassifierError;
use crate::models::RecordError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, null or malformed columns in a scoring request
    #[error("{0}")]
    ValidationError(String),

    /// The loaded model failed during prediction
    #[error(transparent)]
    ClassifierError(#[from] ClassifierError),

    /// Body could not be read as a JSON object, or any other failure
    #[error("{0}")]
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ClassifierError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!("Rejected scoring request: {}", msg);
            }
            AppError::ClassifierError(e) => {
                tracing::error!("Classifier error: {}", e);
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
            }
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
