//! HTTP gateway serving shared files and their preview pages

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ShareConfig;
use crate::error::ShareError;
use crate::network;
use crate::preview::{self, MediaKind, PreviewSource, TokioPreviewSource};
use crate::registry::{file_name_of, ShareRegistry};
use crate::share_id::ShareId;

/// A file that has just been shared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub share_id: ShareId,
    pub file_path: PathBuf,
    pub share_url: String,
}

/// One row of the share history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub share_id: ShareId,
    pub file_name: String,
    pub share_url: String,
}

/// Share server owning the registry for the lifetime of the process
///
/// Also the entry point for a UI layer: [`share_file`](Self::share_file),
/// [`history`](Self::history) and [`delete_share`](Self::delete_share)
/// mirror the `/register`, `/history` and `DELETE /share` routes.
#[derive(Clone)]
pub struct ShareServer {
    registry: ShareRegistry,
    config: Arc<ShareConfig>,
    preview_source: Arc<dyn PreviewSource>,
}

impl ShareServer {
    /// Create a server with an empty registry
    ///
    /// # Arguments
    /// * `config` - Listener, URL and preview settings
    pub fn new(config: ShareConfig) -> Self {
        Self::with_preview_source(config, Arc::new(TokioPreviewSource))
    }

    /// Create a server that reads text previews through `preview_source`
    ///
    /// # Arguments
    /// * `config` - Listener, URL and preview settings
    /// * `preview_source` - Reader used for text preview content
    pub fn with_preview_source(config: ShareConfig, preview_source: Arc<dyn PreviewSource>) -> Self {
        Self {
            registry: ShareRegistry::new(),
            config: Arc::new(config),
            preview_source,
        }
    }

    pub fn registry(&self) -> &ShareRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Register a file and build its share URL
    ///
    /// # Arguments
    /// * `path` - File to share
    ///
    /// # Returns
    /// * `Ok(SharedFile)` - New share id, the path as given, and the
    ///   absolute share URL built from the current LAN address
    /// * `Err(ShareError::InvalidPath)` - The file does not exist; nothing
    ///   is registered
    pub async fn share_file(&self, path: impl Into<PathBuf>) -> crate::Result<SharedFile> {
        let file_path = path.into();
        let share_id = self.registry.register(&file_path).await?;
        let share_url = network::share_url(&self.config, &share_id);
        tracing::info!("Share URL for {}: {}", file_path.display(), share_url);

        Ok(SharedFile {
            share_id,
            file_path,
            share_url,
        })
    }

    /// Every live share in registration order
    ///
    /// # Returns
    /// * One [`HistoryItem`] per non-revoked share, oldest first
    pub fn history(&self) -> Vec<HistoryItem> {
        let base_url = network::base_url(&self.config);
        self.registry
            .list()
            .into_iter()
            .map(|entry| HistoryItem {
                share_url: format!("{}/share/{}", base_url, entry.id),
                file_name: entry.file_name(),
                share_id: entry.id,
            })
            .collect()
    }

    /// Revoke a share
    ///
    /// # Arguments
    /// * `id` - Share to revoke
    ///
    /// # Returns
    /// * `true` if the share existed, `false` otherwise
    pub fn delete_share(&self, id: &ShareId) -> bool {
        self.registry.revoke(id)
    }

    /// Create the axum router with all routes configured
    pub fn router(&self) -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/file/:share_id", get(inline_file))
            .route("/download/:share_id", get(download_file))
            .route("/share/:share_id", get(preview_page).delete(revoke_share))
            .route("/history", get(history))
            .route("/health", get(health_check))
            .with_state(self.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind to the configured host and port and serve until Ctrl-C
    pub async fn serve(self) -> crate::Result<()> {
        let addr = format!("{}:{}", self.config.bind_host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an existing listener until `signal` resolves
    ///
    /// The registry is dropped with the server once this returns.
    ///
    /// # Arguments
    /// * `listener` - Bound TCP listener to accept connections on
    /// * `signal` - Future that starts graceful shutdown when it completes
    ///
    /// # Returns
    /// * `Ok(())` once in-flight requests have finished after `signal`
    /// * `Err(ShareError::Io)` if the listener fails
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> crate::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Share server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;
        tracing::info!("Share server stopped");
        Ok(())
    }

    /// Map a raw path segment to a live share whose file still exists
    ///
    /// Unknown, malformed and vanished shares are indistinguishable.
    async fn resolve(&self, raw_id: &str) -> Result<(ShareId, PathBuf), AppError> {
        let not_found = || AppError::NotFound("File not found".to_string());

        let id: ShareId = raw_id.parse().map_err(|_| not_found())?;
        let path = self.registry.lookup(&id)?;

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok((id, path)),
            _ => {
                tracing::warn!("Shared file for {} is gone: {}", id, path.display());
                Err(not_found())
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
    }
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    filepath: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct RevokeResponse {
    removed: bool,
}

async fn register(
    State(server): State<ShareServer>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filepath = request
        .filepath
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("File does not exist".to_string()))?;

    let shared = server.share_file(filepath).await?;
    Ok(Json(RegisterResponse {
        url: shared.share_url,
    }))
}

async fn history(State(server): State<ShareServer>) -> Json<Vec<HistoryItem>> {
    Json(server.history())
}

async fn revoke_share(
    State(server): State<ShareServer>,
    Path(share_id): Path<String>,
) -> Json<RevokeResponse> {
    let removed = share_id
        .parse::<ShareId>()
        .map(|id| server.delete_share(&id))
        .unwrap_or(false);
    Json(RevokeResponse { removed })
}

/// Health check endpoint
async fn health_check(State(server): State<ShareServer>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!("Share server running. Active shares: {}", server.registry.len()),
    )
}

/// Serve a shared file for embedding in the preview page
async fn inline_file(
    State(server): State<ShareServer>,
    Path(share_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (_, path) = server.resolve(&share_id).await?;
    send_file(path, &headers, None).await
}

/// Serve a shared file as an attachment under its original name
async fn download_file(
    State(server): State<ShareServer>,
    Path(share_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (_, path) = server.resolve(&share_id).await?;
    let disposition = attachment_disposition(&file_name_of(&path));
    send_file(path, &headers, Some(disposition)).await
}

async fn preview_page(
    State(server): State<ShareServer>,
    Path(share_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let (id, path) = server.resolve(&share_id).await?;
    let file_name = file_name_of(&path);
    let mime = preview::mime_for(&path);

    let text = match MediaKind::of(&mime) {
        MediaKind::Text => Some(
            preview::load_text(
                server.preview_source.as_ref(),
                &path,
                server.config.preview_limit,
            )
            .await,
        ),
        _ => None,
    };

    Ok(Html(preview::render_page(&id, &file_name, &mime, text.as_ref())))
}

/// Stream a file with range request support
async fn send_file(
    path: PathBuf,
    headers: &HeaderMap,
    disposition: Option<HeaderValue>,
) -> Result<Response, AppError> {
    let file = File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::NotFound("File not found".to_string())
        } else {
            AppError::Internal(format!("Failed to open file: {}", e))
        }
    })?;

    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to get file metadata: {}", e)))?
        .len();

    let mime_type = preview::mime_for(&path).to_string();

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(disposition) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition);
    }

    let response = match headers.get(header::RANGE) {
        Some(range_header) => {
            let range_str = range_header
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid range header".to_string()))?;
            let range = ByteRange::parse(range_str, file_size)?;
            let mut file = file;
            file.seek(std::io::SeekFrom::Start(range.start))
                .await
                .map_err(|e| AppError::Internal(format!("Failed to seek file: {}", e)))?;

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_LENGTH, range.len())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", range.start, range.end, file_size),
                )
                .body(Body::from_stream(ReaderStream::new(file.take(range.len()))))
        }
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, file_size)
            .body(Body::from_stream(ReaderStream::new(file))),
    };

    response.map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name
fn attachment_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Inclusive byte range from a single-range `Range` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Parse `bytes=a-b`, `bytes=a-` or `bytes=-n` against a file size
    fn parse(value: &str, file_size: u64) -> Result<Self, AppError> {
        let spec = value
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(|| AppError::BadRequest("Invalid range format".to_string()))?;

        if spec.contains(',') {
            return Err(AppError::BadRequest("Multiple ranges are not supported".to_string()));
        }

        let (start, end) = spec
            .split_once('-')
            .ok_or_else(|| AppError::BadRequest("Invalid range format".to_string()))?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            let suffix: u64 = end
                .parse()
                .map_err(|_| AppError::BadRequest("Invalid range end".to_string()))?;
            if suffix == 0 || file_size == 0 {
                return Err(AppError::RangeNotSatisfiable(file_size));
            }
            return Ok(Self {
                start: file_size.saturating_sub(suffix),
                end: file_size - 1,
            });
        }

        let start: u64 = start
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid range start".to_string()))?;
        if start >= file_size {
            return Err(AppError::RangeNotSatisfiable(file_size));
        }

        let end = if end.is_empty() {
            file_size - 1
        } else {
            end.parse::<u64>()
                .map_err(|_| AppError::BadRequest("Invalid range end".to_string()))?
                .min(file_size - 1)
        };

        if start > end {
            return Err(AppError::RangeNotSatisfiable(file_size));
        }

        Ok(Self { start, end })
    }

    fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Application error types
#[derive(Debug)]
enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    RangeNotSatisfiable(u64),
}

impl From<ShareError> for AppError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::InvalidPath(_) => AppError::BadRequest("File does not exist".to_string()),
            ShareError::NotFound => AppError::NotFound("File not found".to_string()),
            other => {
                tracing::error!("Share request failed: {}", other);
                AppError::Internal(other.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: msg })).into_response()
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
            AppError::RangeNotSatisfiable(size) => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                format!("Range not satisfiable. File size: {}", size),
            )
                .into_response(),
        }
    }
}
