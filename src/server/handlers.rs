use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::client::render_client_html;
use super::models::{
    ErrorResponse, ExplainRequest, ExportQuery, HistoriesQuery, HistoriesResponse,
    TranslateRequest, TranslateResponse,
};
use super::state::ServerState;
use crate::error::{ModelError, StoreError};
use crate::explanation::Explanation;
use crate::export;
use crate::history::{self, Cursor, HistoryStore, NewRecord};
use crate::modes::{DialectMode, Direction};
use crate::providers::ModelClient;

type ApiError = (StatusCode, Json<ErrorResponse>);

pub async fn run_server<M: ModelClient, S: HistoryStore>(
    state: ServerState<M, S>,
    addr: &str,
) -> Result<()> {
    let app = router(state)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn router<M: ModelClient, S: HistoryStore>(state: ServerState<M, S>) -> Result<Router> {
    let html = Arc::new(render_client_html(&state.settings)?);
    let app = Router::new()
        .route(
            "/",
            get(move || {
                let html = html.clone();
                async move { Html((*html).clone()) }
            }),
        )
        .route("/health", get(health))
        .route("/translate", post(translate::<M, S>))
        .route("/explain", post(explain::<M, S>))
        .route("/histories", get(histories::<M, S>))
        .route("/export.csv", get(export_csv::<M, S>))
        .with_state(Arc::new(state))
        .layer(axum::middleware::from_fn(cors_middleware));
    Ok(app)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn model_failure(err: anyhow::Error) -> ApiError {
    let status = match err.downcast_ref::<ModelError>() {
        Some(ModelError::Configuration) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(_) => StatusCode::BAD_GATEWAY,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("model request failed: {:#}", err);
    api_error(status, err.to_string())
}

fn store_failure(err: StoreError) -> ApiError {
    let status = match err {
        StoreError::InvalidCursor => StatusCode::BAD_REQUEST,
        StoreError::Configuration(_) | StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    };
    warn!("history request failed: {}", err);
    api_error(status, err.to_string())
}

fn parse_mode(value: Option<&str>, fallback: DialectMode) -> Result<DialectMode, ApiError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse()
            .map_err(|err: anyhow::Error| api_error(StatusCode::BAD_REQUEST, err.to_string())),
        None => Ok(fallback),
    }
}

fn parse_direction(value: Option<&str>) -> Result<Direction, ApiError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse()
            .map_err(|err: anyhow::Error| api_error(StatusCode::BAD_REQUEST, err.to_string())),
        None => Ok(Direction::default()),
    }
}

fn require_user(user_id: &str) -> Result<String, ApiError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "userId is required"));
    }
    Ok(user_id.to_string())
}

async fn translate<M: ModelClient, S: HistoryStore>(
    State(state): State<Arc<ServerState<M, S>>>,
    Json(payload): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let user_id = require_user(&payload.user_id)?;
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "text is required"));
    }
    let mode = parse_mode(payload.mode.as_deref(), state.settings.default_mode)?;
    let direction = parse_direction(payload.direction.as_deref())?;

    let output = state
        .translator
        .translate(mode, direction, text)
        .await
        .map_err(model_failure)?;

    let entry = NewRecord {
        user_id,
        input_text: text.to_string(),
        output_text: output,
        mode,
        direction,
    };
    let response = match state.history.save(entry.clone()).await {
        Ok(record) => TranslateResponse {
            record,
            saved: true,
            warning: None,
        },
        Err(err) => {
            warn!("failed to save translation: {}", err);
            TranslateResponse {
                record: entry.into_optimistic(),
                saved: false,
                warning: Some(err.to_string()),
            }
        }
    };
    Ok(Json(response))
}

async fn explain<M: ModelClient, S: HistoryStore>(
    State(state): State<Arc<ServerState<M, S>>>,
    Json(payload): Json<ExplainRequest>,
) -> Result<Json<Explanation>, ApiError> {
    if payload.input.trim().is_empty() || payload.output.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "input and output are required",
        ));
    }
    let mode = parse_mode(payload.mode.as_deref(), state.settings.default_mode)?;
    let direction = parse_direction(payload.direction.as_deref())?;
    let explanation = state
        .translator
        .explain(mode, direction, &payload.input, &payload.output)
        .await
        .map_err(model_failure)?;
    Ok(Json(explanation))
}

async fn histories<M: ModelClient, S: HistoryStore>(
    State(state): State<Arc<ServerState<M, S>>>,
    Query(query): Query<HistoriesQuery>,
) -> Result<Json<HistoriesResponse>, ApiError> {
    let user_id = require_user(&query.user_id)?;
    let cursor = match query.cursor.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => Some(Cursor::decode(token).map_err(store_failure)?),
        _ => None,
    };
    let page = state
        .history
        .page(user_id, cursor)
        .await
        .map_err(store_failure)?;
    Ok(Json(page.into()))
}

async fn export_csv<M: ModelClient, S: HistoryStore>(
    State(state): State<Arc<ServerState<M, S>>>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&query.user_id)?;
    let records = history::fetch_all(&state.history, &user_id)
        .await
        .map_err(store_failure)?;
    let date = OffsetDateTime::now_utc().date().to_string();
    let disposition = format!("attachment; filename=\"{}\"", export::file_name(&date));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export::to_csv(&records),
    ))
}
