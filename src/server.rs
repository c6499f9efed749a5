//! HTTP API: the compression endpoint and a liveness probe.
//!
//! The wire contract mirrors the classic "upload, compress, get JSON back"
//! shape: a multipart form with a `file` part and an optional
//! `compressionLevel` part, answered with a JSON payload carrying the
//! base64-encoded result and its size report. Errors come back as
//! `{ success: false, error, category }` with the category as a stable
//! machine-readable string.
//!
//! Status mapping: bad uploads and unknown profiles are the client's fault
//! (400), a missing tool is an operational condition worth retrying later
//! (503), and a blown deadline is 504.

use crate::config::{QualityProfile, SqueezeConfig};
use crate::error::{ErrorCategory, SqueezeError};
use crate::squeeze::squeeze;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use std::net::SocketAddr;
use std::process::Command;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Default request body cap. PDF uploads are large; 100 MiB covers
/// everything the tools can realistically chew through in one deadline.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 100 * 1024 * 1024;

/// Build the application router.
///
/// Separate from [`serve`] so tests can drive the router directly with
/// `tower::ServiceExt::oneshot` and no socket.
pub fn app(config: SqueezeConfig, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/api/pdf-compress", post(compress))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(config))
}

/// Bind `addr` and serve the API until the process exits.
pub async fn serve(
    addr: SocketAddr,
    config: SqueezeConfig,
    body_limit_bytes: usize,
) -> Result<(), SqueezeError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SqueezeError::Internal(format!("bind {addr}: {e}")))?;
    info!(%addr, "pdfsqueeze API listening");

    axum::serve(listener, app(config, body_limit_bytes))
        .await
        .map_err(|e| SqueezeError::Internal(format!("server error: {e}")))
}

// ── Payloads ─────────────────────────────────────────────────────────────

/// Success payload for `POST /api/pdf-compress`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompressResponse {
    success: bool,
    /// Base64-encoded output document.
    compressed_pdf: String,
    original_size: u64,
    compressed_size: u64,
    /// Rounded percentage reduction; 0 when the original came back.
    compression_ratio: u8,
    /// The effective profile the run used.
    compression_level: QualityProfile,
}

/// Error payload shared by every failure path.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    category: ErrorCategory,
}

/// Liveness payload; reports whether the external tools can be spawned.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    gs: bool,
    qpdf: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn compress(
    State(config): State<Arc<SqueezeConfig>>,
    mut multipart: Multipart,
) -> Result<Json<CompressResponse>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut level: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Multipart(e.to_string()))?;
                file = Some(bytes.to_vec());
            }
            Some("compressionLevel") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(e.to_string()))?;
                level = Some(text);
            }
            // Unknown parts are ignored rather than rejected; browsers and
            // proxies love to add their own.
            _ => {}
        }
    }

    let bytes = file.ok_or(ApiError::MissingFile)?;

    // Absent or empty level falls back to the default profile.
    let profile = match level.as_deref().map(str::trim) {
        None | Some("") => QualityProfile::default(),
        Some(s) => s.parse::<QualityProfile>().map_err(ApiError::Squeeze)?,
    };

    info!(size = bytes.len(), profile = %profile, "compression request");

    let outcome = squeeze(bytes, &config.with_profile(profile)).await?;

    Ok(Json(CompressResponse {
        success: true,
        compressed_pdf: BASE64.encode(&outcome.data),
        original_size: outcome.report.original_size,
        compressed_size: outcome.report.final_size,
        compression_ratio: outcome.report.reduction_percent,
        compression_level: profile,
    }))
}

async fn health(State(config): State<Arc<SqueezeConfig>>) -> Json<HealthResponse> {
    let (gs_bin, qpdf_bin) = (config.gs_binary.clone(), config.qpdf_binary.clone());
    let (gs, qpdf) =
        tokio::task::spawn_blocking(move || (tool_available(&gs_bin), tool_available(&qpdf_bin)))
            .await
            .unwrap_or((false, false));

    Json(HealthResponse {
        status: if gs && qpdf { "ok" } else { "degraded" },
        gs,
        qpdf,
    })
}

fn tool_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

// ── Error mapping ────────────────────────────────────────────────────────

/// Handler-level failures; everything becomes an [`ErrorBody`].
#[derive(Debug)]
enum ApiError {
    /// No `file` part in the form.
    MissingFile,
    /// The multipart stream itself was malformed or over the limit.
    Multipart(String),
    /// The library rejected the run.
    Squeeze(SqueezeError),
}

impl From<SqueezeError> for ApiError {
    fn from(e: SqueezeError) -> Self {
        ApiError::Squeeze(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category, message) = match self {
            ApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                ErrorCategory::InvalidRequest,
                "No file provided".to_string(),
            ),
            ApiError::Multipart(detail) => (
                StatusCode::BAD_REQUEST,
                ErrorCategory::InvalidRequest,
                format!("Malformed upload: {detail}"),
            ),
            ApiError::Squeeze(e) => {
                // Raw tool stderr stays in the server log; the client gets
                // the category plus the curated message and hint.
                warn!(error = %e, "request failed");
                (status_for(e.category()), e.category(), e.to_string())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
                category,
            }),
        )
            .into_response()
    }
}

fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::InvalidInputDocument | ErrorCategory::InvalidRequest => {
            StatusCode::BAD_REQUEST
        }
        ErrorCategory::CompressionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
