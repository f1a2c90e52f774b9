mod account;
mod auth;
mod error;
mod transfer;

use crate::{api::error::ApiError, domain::AccountRepository, token::TokenService};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use opentelemetry::{global, propagation::Extractor, trace::TraceContextExt};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::net::IpAddr;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{field, info, info_span, warn, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    addr: IpAddr,
    port: u16,
    /// Issue tokens on account creation and require them for `/account/id/{id}`.
    #[serde(default)]
    pub token_auth: bool,
}

#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        account::list_accounts,
        account::create_account,
        account::get_account,
        account::delete_account,
        transfer::transfer
    ),
    components(schemas(
        crate::domain::Account,
        account::CreateAccountRequest,
        transfer::TransferRequest,
        error::ErrorResponse
    ))
)]
pub struct ApiDoc;

/// Serve the API; token authentication is enabled if a [TokenService] is given.
pub async fn serve<R>(
    config: Config,
    account_repository: R,
    token_service: Option<TokenService>,
) -> Result<()>
where
    R: AccountRepository,
{
    let Config { addr, port, .. } = config;

    let app_state = AppState {
        account_repository,
        token_service,
    };

    let app = app(app_state)
        .merge(SwaggerUi::new("/api-doc").url("/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(CorsLayer::permissive())
                .map_request(accept_trace)
                .map_request(record_trace_id),
        );

    let listener = TcpListener::bind((addr, port))
        .await
        .context("bind TcpListener")?;
    info!(%addr, port, "JSON API server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run server")
}

#[derive(Clone)]
struct AppState<R> {
    account_repository: R,
    token_service: Option<TokenService>,
}

fn app<R>(app_state: AppState<R>) -> Router
where
    R: AccountRepository,
{
    let account_with_id = get(account::get_account::<R>)
        .head(method_not_allowed)
        .delete(account::delete_account::<R>)
        .fallback(method_not_allowed);
    let account_with_id = match &app_state.token_service {
        Some(token_service) => {
            let token_gate = auth::TokenGate {
                token_service: token_service.clone(),
                account_repository: app_state.account_repository.clone(),
            };
            account_with_id.layer(middleware::from_fn_with_state(
                token_gate,
                auth::require_token::<R>,
            ))
        }

        None => account_with_id,
    };

    Router::new()
        .route("/", get(ready).head(method_not_allowed))
        .route(
            "/account",
            get(account::list_accounts::<R>)
                .head(method_not_allowed)
                .post(account::create_account::<R>)
                .fallback(method_not_allowed),
        )
        .route("/account/id/:id", account_with_id)
        .route(
            "/transfer",
            post(transfer::transfer).fallback(method_not_allowed),
        )
        .with_state(app_state)
}

/// Decode a JSON request body; the content type is not checked.
fn decode_json<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(body).map_err(|_| ApiError::invalid_json())
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::InvalidInput(format!("{method} method not allowed"))
}

async fn ready() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({})))
}

async fn shutdown_signal() {
    signal(SignalKind::terminate())
        .expect("install SIGTERM handler")
        .recv()
        .await;
}

fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    info_span!("incoming request", %method, path, trace_id = field::Empty)
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| {
            let s = v.to_str();
            if let Err(ref error) = s {
                warn!(%error, ?v, "cannot convert header value to ASCII")
            };
            s.ok()
        })
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

fn accept_trace(request: Request<Body>) -> Request<Body> {
    // Current context, if no or invalid data is received.
    let parent_context = global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(request.headers()))
    });
    Span::current().set_parent(parent_context);

    request
}

fn record_trace_id(request: Request<Body>) -> Request<Body> {
    let span = Span::current();

    let trace_id = span.context().span().span_context().trace_id();
    span.record("trace_id", trace_id.to_string());

    request
}
