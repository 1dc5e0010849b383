//! Engrave Design Store
//!
//! An HTTP service that keeps engraving designs by project code.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health
//! POST /projects                   -> { "code": "AB12CD34" }
//! GET  /projects                   -> [ { code, status, updatedAt, hasDesign } ]
//! GET  /projects/{code}            -> full project record
//! PUT  /projects/{code}/design     { "canvasState": {...}, "thumbnail": "data:image/png;base64,..." }
//! PUT  /projects/{code}/status     { "status": "in-progress", "notes": "..." }
//! ```
//!
//! Designs are validated and canonicalized before they are stored. Saving
//! replaces the stored design; the last writer wins.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use engrave_core::document::SceneDocument;
use engrave_core::error::LoadError;
use engrave_core::objects::decode_data_uri;
use engrave_core::project::{ProjectRecord, ProjectStatus, ProjectSummary};
use engrave_core::storage::{FileStorage, ProjectGateway, Storage, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

const DEFAULT_ADDR: &str = "0.0.0.0:3030";

/// Server configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
struct ServerConfig {
    addr: SocketAddr,
    data_dir: PathBuf,
}

impl ServerConfig {
    /// `ENGRAVE_ADDR` and `ENGRAVE_DATA_DIR`.
    fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let addr = lookup("ENGRAVE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .map_err(|e| format!("invalid ENGRAVE_ADDR {:?}: {}", addr, e))?;
        let data_dir = match lookup("ENGRAVE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => FileStorage::default_path().map_err(|e| e.to_string())?,
        };
        Ok(Self { addr, data_dir })
    }
}

/// Shared application state
struct AppState<S: Storage> {
    gateway: ProjectGateway<S>,
}

impl<S: Storage> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

impl<S: Storage> AppState<S> {
    fn new(storage: S) -> Self {
        Self {
            gateway: ProjectGateway::new(Arc::new(storage)),
        }
    }
}

/// A failed request, answered as `{ "error": message }`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        let status = match error {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Storage failure: {}", error);
        }
        Self::new(status, error.to_string())
    }
}

impl From<LoadError> for ApiError {
    fn from(error: LoadError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DesignUpload {
    canvas_state: Value,
    #[serde(default)]
    thumbnail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DesignSaved {
    code: String,
    objects: usize,
    /// Records that could not be read and were left out.
    rejected: usize,
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Created {
    code: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engrave_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let storage = FileStorage::new(&config.data_dir)?;
    info!("Storing projects in {}", config.data_dir.display());

    let app = router(AppState::new(storage));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Engrave design store listening on {}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router<S: Storage + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects", get(list_projects::<S>).post(create_project::<S>))
        .route("/projects/{code}", get(get_project::<S>))
        .route("/projects/{code}/design", put(put_design::<S>))
        .route("/projects/{code}/status", put(put_status::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn create_project<S: Storage>(
    State(state): State<AppState<S>>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let code = state.gateway.create_project().await?;
    Ok((StatusCode::CREATED, Json(Created { code })))
}

async fn list_projects<S: Storage>(State(state): State<AppState<S>>) -> ApiResult<Vec<ProjectSummary>> {
    Ok(Json(state.gateway.list().await?))
}

async fn get_project<S: Storage>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
) -> ApiResult<ProjectRecord> {
    Ok(Json(state.gateway.project(&code).await?))
}

/// Validate and store a design. Unreadable object records are dropped and
/// counted; a structurally broken design is refused with 422.
async fn put_design<S: Storage>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
    Json(upload): Json<DesignUpload>,
) -> ApiResult<DesignSaved> {
    state.gateway.project(&code).await?;

    let decoded = match &upload.canvas_state {
        // Older editors send the design as JSON text.
        Value::String(text) => SceneDocument::from_json(text)?,
        value => SceneDocument::decode(value)?,
    };
    for rejected in &decoded.rejected {
        warn!(
            "Project {}: dropping object {} ({}): {}",
            code, rejected.index, rejected.kind, rejected.reason
        );
    }

    let preview = upload.thumbnail.as_deref().map(decode_thumbnail).transpose()?;
    state
        .gateway
        .put(&code, &decoded.document, preview.as_deref())
        .await?;

    info!("Stored design for {}", code);
    Ok(Json(DesignSaved {
        code,
        objects: decoded.document.objects.len(),
        rejected: decoded.rejected.len(),
    }))
}

async fn put_status<S: Storage>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<ProjectRecord> {
    let status = ProjectStatus::parse(&update.status).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("unknown status {:?}", update.status),
        )
    })?;
    let record = state.gateway.set_status(&code, status, update.notes).await?;
    Ok(Json(record))
}

/// Thumbnails arrive as `data:` URIs or bare base64.
fn decode_thumbnail(thumbnail: &str) -> Result<Vec<u8>, ApiError> {
    let bytes = if thumbnail.starts_with("data:") {
        decode_data_uri(thumbnail).map_err(|e| e.to_string())
    } else {
        STANDARD.decode(thumbnail.trim()).map_err(|e| e.to_string())
    };
    bytes.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid thumbnail: {}", e)))
}
