use crate::{
    api::{
        decode_json,
        error::{ApiError, ErrorResponse},
        AppState,
    },
    domain::{Account, AccountRepository},
    token::TOKEN_HEADER,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use error_ext::StdErrorExt;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

/// Missing fields are decoded as empty names.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
}

/// List all accounts.
#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "All accounts", body = [Account]),
        (status = 400, description = "Storage failure", body = ErrorResponse),
    )
)]
#[instrument(skip(app_state))]
pub async fn list_accounts<R>(
    State(app_state): State<AppState<R>>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AccountRepository,
{
    let accounts = app_state
        .account_repository
        .accounts()
        .await
        .map_err(ApiError::storage)?
        .try_collect::<Vec<_>>()
        .await
        .map_err(ApiError::storage)?;

    Ok((StatusCode::OK, Json(accounts)))
}

/// Get the account with the given ID.
#[utoipa::path(
    get,
    path = "/account/id/{id}",
    params(("id" = i32, Path, description = "Account ID")),
    responses(
        (status = 200, description = "The account", body = Account),
        (status = 400, description = "Invalid or unknown ID", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
#[instrument(skip(app_state))]
pub async fn get_account<R>(
    State(app_state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AccountRepository,
{
    let id = parse_id(&id)?;
    let account = app_state
        .account_repository
        .account_by_id(id)
        .await
        .map_err(ApiError::storage)?
        .ok_or(ApiError::NotFound(id))?;

    Ok((StatusCode::OK, Json(account)))
}

/// Create an account. If token authentication is enabled, a token for the new account is returned
/// in the `x-jwt-token` header.
#[utoipa::path(
    post,
    path = "/account",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "The created account", body = Account),
        (status = 400, description = "Invalid JSON or storage failure", body = ErrorResponse),
    )
)]
#[instrument(skip(app_state, body))]
pub async fn create_account<R>(
    State(app_state): State<AppState<R>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    R: AccountRepository,
{
    let CreateAccountRequest {
        first_name,
        last_name,
    } = decode_json(&body)?;

    let account = app_state
        .account_repository
        .create_account(Account::new(first_name, last_name))
        .await
        .map_err(|error| ApiError::Storage(format!("creating account: {}", error.as_chain())))?;
    info!(id = account.id, account_number = account.account_number, "created account");

    let mut headers = HeaderMap::new();
    if let Some(token_service) = &app_state.token_service {
        let token = token_service
            .issue(account.account_number)
            .inspect_err(|e| error!(error = e.as_chain(), "cannot issue token"))
            .map_err(|_| ApiError::TokenIssue)?;
        let token = HeaderValue::try_from(token).map_err(|_| ApiError::TokenIssue)?;
        headers.insert(TOKEN_HEADER, token);
    }

    Ok((StatusCode::CREATED, headers, Json(account)))
}

/// Delete the account with the given ID.
#[utoipa::path(
    delete,
    path = "/account/id/{id}",
    params(("id" = i32, Path, description = "Account ID")),
    responses(
        (status = 202, description = "Deletion accepted"),
        (status = 400, description = "Invalid ID or storage failure", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
#[instrument(skip(app_state))]
pub async fn delete_account<R>(
    State(app_state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AccountRepository,
{
    let id = parse_id(&id)?;
    app_state
        .account_repository
        .delete_account(id)
        .await
        .map_err(ApiError::storage)?;
    info!(id, "deleted account");

    Ok((StatusCode::ACCEPTED, Json(json!({ "delete": id }))))
}

pub fn parse_id(id: &str) -> Result<i32, ApiError> {
    id.parse().map_err(|_| ApiError::invalid_id(id))
}
