//! Scoring handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{FeatureRecord, PredictResponse};
use crate::{AppError, AppResult, AppState};

/// Score one transaction
#[tracing::instrument(name = "predict", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Json(body) = payload.map_err(|e| AppError::InternalError(e.body_text()))?;

    let object = body
        .as_object()
        .ok_or_else(|| AppError::InternalError("payload is not a JSON object".to_string()))?;

    let record = FeatureRecord::from_object(object)?;
    tracing::debug!(?record, "Scoring request accepted");

    let fraude = state.classifier.predict(&record)?;

    if fraude {
        tracing::warn!(amount = record.amount, location = %record.location, "Transaction flagged as fraud");
    } else {
        tracing::info!("Transaction scored as legitimate");
    }

    Ok(Json(PredictResponse { fraude }))
}
