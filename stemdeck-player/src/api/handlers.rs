//! HTTP request handlers
//!
//! Every handler takes the transport lock for exactly one operation.

use crate::api::server::AppContext;
use crate::audio::AudioOutput;
use crate::engine::{ProgressReport, TrackSnapshot};
use crate::error::Error;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stemdeck_common::config::ManifestEntry;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    manifest: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    status: String,
    duration_seconds: f64,
    tracks: Vec<TrackSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    position_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct SeekResponse {
    status: String,
    position_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct TracksResponse {
    tracks: Vec<TrackSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct GainRequest {
    gain: f32,
}

#[derive(Debug, Deserialize)]
pub struct TrimRequest {
    trim: f32,
}

#[derive(Debug, Serialize)]
pub struct TrimResponse {
    index: usize,
    trim: f32,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    devices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GainResponse {
    index: usize,
    gain: f32,
    muted: bool,
}

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

/// Map an engine error onto a status code and JSON body
pub fn error_response(e: &Error) -> ApiError {
    let code = match e {
        Error::TrackNotFound(_) | Error::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

fn gain_response(index: usize, gain: f32) -> Json<GainResponse> {
    Json(GainResponse {
        index,
        gain,
        muted: gain == 0.0,
    })
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "stemdeck-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

// ============================================================================
// Transport Endpoints
// ============================================================================

/// POST /playback/load
///
/// Body is optional; an empty body loads the configured manifest, a body
/// that is not a valid `LoadRequest` is rejected.
/// Decoding runs on the blocking pool while the transport lock is held.
pub async fn load(State(ctx): State<AppContext>, body: Bytes) -> ApiResult<LoadResponse> {
    let manifest = if body.iter().all(u8::is_ascii_whitespace) {
        ctx.manifest.as_ref().clone()
    } else {
        serde_json::from_slice::<LoadRequest>(&body)
            .map_err(|e| {
                error_response(&Error::BadRequest(format!("invalid load request: {}", e)))
            })?
            .manifest
    };
    if manifest.is_empty() {
        return Err(error_response(&Error::BadRequest(
            "manifest must list at least one track".to_string(),
        )));
    }

    let mut transport = Arc::clone(&ctx.transport).lock_owned().await;
    let joined = tokio::task::spawn_blocking(move || {
        transport.load(&manifest).map(|()| LoadResponse {
            status: "ok".to_string(),
            duration_seconds: transport.duration(),
            tracks: transport.track_snapshots(),
        })
    })
    .await;

    match joined {
        Ok(Ok(response)) => {
            info!("Loaded {} tracks", response.tracks.len());
            Ok(Json(response))
        }
        Ok(Err(e)) => {
            error!("Load failed: {}", e);
            Err(error_response(&e))
        }
        Err(e) => {
            error!("Load task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("error: load task failed: {}", e),
                }),
            ))
        }
    }
}

/// POST /playback/play
pub async fn play(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    let mut transport = ctx.transport.lock().await;
    transport.play().map_err(|e| {
        error!("Play command failed: {}", e);
        error_response(&e)
    })?;
    Ok(ok())
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.transport.lock().await.pause();
    ok()
}

/// POST /playback/stop
pub async fn stop(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.transport.lock().await.stop();
    ok()
}

/// POST /playback/seek
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(request): Json<SeekRequest>,
) -> ApiResult<SeekResponse> {
    let mut transport = ctx.transport.lock().await;
    transport
        .seek(request.position_seconds)
        .map_err(|e| error_response(&e))?;

    Ok(Json(SeekResponse {
        status: "ok".to_string(),
        position_seconds: transport.paused_position(),
    }))
}

/// GET /playback/status
pub async fn status(State(ctx): State<AppContext>) -> Json<ProgressReport> {
    let transport = ctx.transport.lock().await;
    Json(transport.report(transport.now()))
}

// ============================================================================
// Mixer Endpoints
// ============================================================================

/// GET /tracks
pub async fn list_tracks(State(ctx): State<AppContext>) -> Json<TracksResponse> {
    let transport = ctx.transport.lock().await;
    Json(TracksResponse {
        tracks: transport.track_snapshots(),
    })
}

/// GET /tracks/:index/gain
pub async fn get_gain(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> ApiResult<GainResponse> {
    let gain = ctx
        .transport
        .lock()
        .await
        .gain(index)
        .map_err(|e| error_response(&e))?;
    Ok(gain_response(index, gain))
}

/// POST /tracks/:index/gain
pub async fn set_gain(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
    Json(request): Json<GainRequest>,
) -> ApiResult<GainResponse> {
    ctx.transport
        .lock()
        .await
        .set_gain(index, request.gain)
        .map_err(|e| error_response(&e))?;
    Ok(gain_response(index, request.gain))
}

/// POST /tracks/:index/mute
pub async fn toggle_mute(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> ApiResult<GainResponse> {
    let gain = ctx
        .transport
        .lock()
        .await
        .toggle_mute(index)
        .map_err(|e| error_response(&e))?;
    Ok(gain_response(index, gain))
}

/// POST /tracks/:index/trim
pub async fn set_trim(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
    Json(request): Json<TrimRequest>,
) -> ApiResult<TrimResponse> {
    ctx.transport
        .lock()
        .await
        .set_trim(index, request.trim)
        .map_err(|e| error_response(&e))?;
    Ok(Json(TrimResponse {
        index,
        trim: request.trim,
    }))
}

// ============================================================================
// Audio Device Endpoints
// ============================================================================

/// GET /audio/devices
pub async fn list_devices() -> ApiResult<DevicesResponse> {
    let devices = tokio::task::spawn_blocking(AudioOutput::list_devices)
        .await
        .map_err(|e| {
            error_response(&Error::AudioOutput(format!("device query failed: {}", e)))
        })?
        .map_err(|e| {
            error!("Failed to list audio devices: {}", e);
            error_response(&e)
        })?;
    Ok(Json(DevicesResponse { devices }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (Error::TrackNotFound(4), StatusCode::NOT_FOUND),
            (
                Error::ResourceNotFound {
                    filename: "bs_10.wav".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                Error::InvalidState("playing".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                Error::Decode {
                    path: "x.wav".into(),
                    message: "bad header".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (Error::BadRequest("nan".to_string()), StatusCode::BAD_REQUEST),
            (
                Error::GraphStart("no device".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let (code, Json(body)) = error_response(&error);
            assert_eq!(code, expected, "{}", error);
            assert!(body.status.starts_with("error: "));
        }
    }
}
