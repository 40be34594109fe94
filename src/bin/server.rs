//! Thin HTTP front end. Routes requests to [`vdkio::api::Api`]; the router
//! itself makes no decisions beyond dispatch and byte-range streaming.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path as AxumPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vdkio::api::Api;
use vdkio::config::Config;
use vdkio::error::VdkError;

struct AppState {
    api: Arc<Api>,
}

/// Runs a blocking `Api` call on the blocking thread pool, mapping a task
/// join failure (the closure panicked) to an internal error response.
async fn run_blocking<F, T>(f: F) -> Result<T, Response>
where
    F: FnOnce() -> vdkio::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(error_response),
        Err(e) => {
            error!(%e, "blocking task panicked");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vdkio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("VDKIO_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = Config::load(&PathBuf::from(config_path))?;
    let bind_addr = config.server.bind_addr.clone();

    let state = Arc::new(AppState {
        api: Arc::new(Api::new(Arc::new(config))),
    });

    let app = Router::new()
        .route("/", get(welcome_handler))
        .route("/hls/{*path}", get(playlist_handler))
        .route("/video/{*path}", get(segment_handler))
        .route("/createIndex/{*path}", get(create_index_handler))
        .route("/api/get_process_info", get(progress_handler))
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(tower_http::trace::DefaultMakeSpan::default())
                .on_response(tower_http::trace::DefaultOnResponse::default()),
        );

    info!(%bind_addr, "vdkio listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn welcome_handler() -> &'static str {
    "vdkio"
}

fn error_response(err: VdkError) -> Response {
    error!(%err, "request failed");
    (StatusCode::NOT_FOUND, err.to_string()).into_response()
}

async fn playlist_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(path): AxumPath<String>,
    headers: axum::http::HeaderMap,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string();

    let api = state.api.clone();
    match run_blocking(move || api.build_playlist(&path, &host)).await {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
            text,
        )
            .into_response(),
        Err(resp) => resp,
    }
}

async fn create_index_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(path): AxumPath<String>,
) -> Response {
    let (group, rel_stem) = match vdkio::playlist::parse_create_index_uri(&path) {
        Ok(parsed) => (parsed.group, parsed.rel_stem),
        Err(e) => return error_response(e),
    };
    let api = state.api.clone();
    match run_blocking(move || api.create_index(&group, &rel_stem)).await {
        Ok(()) => (StatusCode::OK, "index built").into_response(),
        Err(resp) => resp,
    }
}

async fn progress_handler(State(state): State<Arc<AppState>>) -> Response {
    let entries = state.api.get_progress();
    let json: Vec<_> = entries
        .into_iter()
        .map(|p| {
            serde_json::json!({
                "filePath": p.file_path,
                "fileSize": vdkio::api::human_readable_bytes(p.file_size),
                "progress": p.progress,
            })
        })
        .collect();
    Json(json).into_response()
}

async fn segment_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(path): AxumPath<String>,
) -> Response {
    let api = state.api.clone();
    let (segment, source_path) = match run_blocking(move || api.get_segment(&path)).await {
        Ok(result) => result,
        Err(resp) => return resp,
    };

    match read_range(&source_path, segment.start_offset..segment.start_offset + segment.size).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "video/mp2t")],
            Body::from(bytes),
        )
            .into_response(),
        Err(e) => {
            error!(%e, "failed to read segment bytes");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to read segment").into_response()
        }
    }
}

async fn read_range(path: &std::path::Path, range: Range<u64>) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(range.start)).await?;
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}
