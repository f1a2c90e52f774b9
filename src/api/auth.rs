use crate::{
    api::{account::parse_id, error::ApiError},
    domain::AccountRepository,
    token::{TokenService, TOKEN_HEADER},
};
use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use error_ext::StdErrorExt;
use thiserror::Error;
use tracing::debug;

/// Reasons for denying access; never exposed to the caller.
#[derive(Debug, Error)]
enum Denial {
    #[error("missing token header")]
    MissingToken,

    #[error(transparent)]
    InvalidToken(#[from] crate::token::TokenError),

    #[error("invalid account ID")]
    InvalidId,

    #[error("cannot look up account")]
    Lookup(#[source] error_ext::BoxError),

    #[error("account not found")]
    NotFound,

    #[error("token issued for another account")]
    IssuerMismatch,
}

/// State of [require_token].
#[derive(Clone)]
pub struct TokenGate<R> {
    pub token_service: TokenService,
    pub account_repository: R,
}

/// Middleware which only forwards requests carrying a valid token issued for the account
/// identified by the `id` path parameter; all others are answered with 401.
pub async fn require_token<R>(
    State(token_gate): State<TokenGate<R>>,
    Path(id): Path<String>,
    request: Request,
    next: Next,
) -> Response
where
    R: AccountRepository,
{
    let authorized = authorize(&token_gate, &id, request.headers()).await;
    match authorized {
        Ok(()) => next.run(request).await,

        Err(denial) => {
            debug!(error = denial.as_chain(), id, "denying access");
            ApiError::AuthDenied.into_response()
        }
    }
}

async fn authorize<R>(
    token_gate: &TokenGate<R>,
    id: &str,
    headers: &HeaderMap,
) -> Result<(), Denial>
where
    R: AccountRepository,
{
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|token| token.to_str().ok())
        .ok_or(Denial::MissingToken)?;
    let claims = token_gate.token_service.validate(token)?;

    let id = parse_id(id).map_err(|_| Denial::InvalidId)?;
    let account = token_gate
        .account_repository
        .account_by_id(id)
        .await
        .map_err(|error| Denial::Lookup(error.into()))?
        .ok_or(Denial::NotFound)?;

    if claims.iss != account.account_number.to_string() {
        return Err(Denial::IssuerMismatch);
    }

    Ok(())
}
