//! HTTP server setup and routing

use crate::engine::Transport;
use crate::error::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stemdeck_common::config::ManifestEntry;
use stemdeck_common::EventBus;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    /// The transport; one lock held per operation
    pub transport: Arc<Mutex<Transport>>,
    /// Event bus the transport emits on
    pub events: EventBus,
    /// Manifest used when a load request carries none
    pub manifest: Arc<Vec<ManifestEntry>>,
    /// Interval between PlaybackProgress events on the SSE stream
    pub progress_interval: Duration,
}

impl AppContext {
    pub fn new(
        transport: Transport,
        events: EventBus,
        manifest: Vec<ManifestEntry>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            events,
            manifest: Arc::new(manifest),
            progress_interval,
        }
    }
}

/// Build the router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let api = Router::new()
        .route("/health", get(super::handlers::health))
        // Transport
        .route("/playback/load", post(super::handlers::load))
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/pause", post(super::handlers::pause))
        .route("/playback/stop", post(super::handlers::stop))
        .route("/playback/seek", post(super::handlers::seek))
        .route("/playback/status", get(super::handlers::status))
        // Mixer
        .route("/tracks", get(super::handlers::list_tracks))
        .route(
            "/tracks/:index/gain",
            get(super::handlers::get_gain).post(super::handlers::set_gain),
        )
        .route("/tracks/:index/mute", post(super::handlers::toggle_mute))
        .route("/tracks/:index/trim", post(super::handlers::set_trim))
        // Output devices
        .route("/audio/devices", get(super::handlers::list_devices))
        // SSE event stream
        .route("/events", get(super::sse::event_stream));

    Router::new()
        .route("/health", get(super::handlers::health))
        .nest("/api/v1", api)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API on `port` until `shutdown` resolves
pub async fn run<F>(ctx: AppContext, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
