//! Server-Sent Events (SSE) broadcaster
//!
//! Streams transport events to connected clients, interleaved with a
//! `PlaybackProgress` sample every `progress_interval` while playing.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use stemdeck_common::TransportEvent;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let transport_events =
        BroadcastStream::new(ctx.events.subscribe()).filter_map(|result| async move {
            match result {
                Ok(event) => Some(event),
                Err(e) => {
                    // Lagged receiver; later events still arrive
                    warn!("SSE stream error: {:?}", e);
                    None
                }
            }
        });

    let transport = ctx.transport.clone();
    let progress_events = IntervalStream::new(tokio::time::interval(ctx.progress_interval))
        .then(move |_| {
            let transport = transport.clone();
            async move {
                let transport = transport.lock().await;
                if !transport.is_playing() {
                    return None;
                }
                let report = transport.report(transport.now());
                Some(TransportEvent::PlaybackProgress {
                    progress: report.progress,
                    position_seconds: report.position_seconds,
                    duration_seconds: report.duration_seconds,
                    timestamp: chrono::Utc::now(),
                })
            }
        })
        .filter_map(|event| async move { event });

    let stream =
        stream::select(transport_events, progress_events).filter_map(|event| async move {
            match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            }
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
