use crate::api::{
    decode_json,
    error::{ApiError, ErrorResponse},
};
use axum::{body::Bytes, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Transfer request; only echoed back, never applied to any balance. Missing fields are decoded
/// as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct TransferRequest {
    #[serde(rename = "toacountnumber")]
    pub to_account_number: i64,
    pub amount: f64,
}

/// Accept a transfer request and echo it.
#[utoipa::path(
    post,
    path = "/transfer",
    request_body = TransferRequest,
    responses(
        (status = 202, description = "Transfer accepted", body = TransferRequest),
        (status = 400, description = "Invalid JSON", body = ErrorResponse),
    )
)]
#[instrument(skip(body))]
pub async fn transfer(body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let transfer_request = decode_json::<TransferRequest>(&body)?;
    info!(?transfer_request, "accepted transfer");

    Ok((StatusCode::ACCEPTED, Json(transfer_request)))
}
