use crate::editor::DictionaryEditor;
use crate::pipeline::{PipelineError, TranslateRequest, TranslateResponse, TranslationPipeline};
use crate::security::bearer_matches;
use crate::store::{DictionaryRow, Scope, StoreError};
use crate::terms::{CacheError, MetricsReport};
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TranslationPipeline>,
    pub editor: DictionaryEditor,
    /// Required bearer key; `None` disables authentication
    pub api_key: Option<Arc<str>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/translate", post(translate))
        .route(
            "/dictionary/:entity/:project/:group/:lang",
            put(upsert_entry).delete(delete_entry),
        )
        .route(
            "/dictionary/:entity/:project/:group",
            axum::routing::delete(delete_group),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    NotFound,
    Pipeline(PipelineError),
    Store(StoreError),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Pipeline(PipelineError::Lookup(CacheError::Store(e)))
            | ApiError::Store(e) => {
                error!("Dictionary store error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Pipeline(e @ PipelineError::Lookup(_)) => {
                error!("Dictionary lookup failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Pipeline(e @ PipelineError::Translation { .. }) => {
                error!("Translation failed: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(());
    };
    let provided = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if bearer_matches(provided, expected) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    Json(state.pipeline.cache().metrics().report())
}

async fn translate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    authorize(&state, &headers)?;

    if request.target_languages.is_empty() {
        return Err(ApiError::BadRequest(
            "target_languages must not be empty".to_string(),
        ));
    }

    let response = state.pipeline.translate(&request).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct EntryBody {
    pub text: String,
}

async fn upsert_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((entity, project, group, lang)): Path<(String, String, String, String)>,
    Json(body): Json<EntryBody>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;

    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    state
        .editor
        .upsert(
            &Scope::new(entity, project),
            DictionaryRow::new(group, lang, body.text),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((entity, project, group, lang)): Path<(String, String, String, String)>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;

    let removed = state
        .editor
        .delete_entry(&Scope::new(entity, project), &group, &lang)
        .await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedBody {
    pub deleted: u64,
}

async fn delete_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((entity, project, group)): Path<(String, String, String)>,
) -> Result<Json<DeletedBody>, ApiError> {
    authorize(&state, &headers)?;

    let deleted = state
        .editor
        .delete_group(&Scope::new(entity, project), &group)
        .await?;
    Ok(Json(DeletedBody { deleted }))
}
