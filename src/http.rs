//! HTTP routes served next to the WebSocket endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::LibrarySettings;
use crate::gateway::{Gateway, Outgoing, session, song_list};
use crate::library;
use crate::player::NormalizedSwap;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub folder: Arc<PathBuf>,
    pub library: Arc<LibrarySettings>,
}

#[derive(Debug, Deserialize)]
struct NormalizedRequest {
    original: PathBuf,
    normalized: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/status", get(status_handler))
        .route("/api/songs", get(songs_handler))
        .route("/api/rescan", post(rescan_handler))
        .route("/api/normalized", post(normalized_handler))
        .route("/api/release", post(release_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::serve_socket(socket, state.gateway))
}

/// Run `op` on the blocking pool. The player lock can be held across audio
/// decoding, so it is never taken on an async worker.
async fn with_gateway<T, F>(gateway: &Arc<Gateway>, op: F) -> Result<T, StatusCode>
where
    F: FnOnce(&Gateway) -> T + Send + 'static,
    T: Send + 'static,
{
    let gw = Arc::clone(gateway);
    tokio::task::spawn_blocking(move || op(&gw))
        .await
        .map_err(|e| {
            error!("Player call panicked: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn status_handler(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let snapshot = with_gateway(&state.gateway, |gw| gw.player().current_state()).await?;
    Ok(Json(snapshot))
}

async fn songs_handler(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let tracks = with_gateway(&state.gateway, |gw| gw.player().tracks()).await?;
    Ok(Json(song_list(&tracks)))
}

async fn rescan_handler(State(state): State<AppState>) -> impl IntoResponse {
    let folder = Arc::clone(&state.folder);
    let settings = Arc::clone(&state.library);
    let rescanned = with_gateway(&state.gateway, move |gw| {
        let tracks = library::scan(&folder, &settings);
        let (snapshot, tracks) = gw.player().replace_catalog(tracks);
        gw.publish_catalog(&snapshot, &tracks);
        (snapshot, tracks)
    })
    .await;

    let Ok((snapshot, tracks)) = rescanned else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Rescan failed" })),
        );
    };
    info!("Rescan finished with {} tracks", tracks.len());

    let body = Outgoing::catalog(snapshot, song_list(&tracks));
    (
        StatusCode::OK,
        Json(serde_json::to_value(&body).unwrap_or_default()),
    )
}

async fn normalized_handler(
    State(state): State<AppState>,
    Json(req): Json<NormalizedRequest>,
) -> impl IntoResponse {
    let original = req.original.clone();
    let applied = with_gateway(&state.gateway, move |gw| {
        gw.player().apply_normalized(&req.original, &req.normalized)
    })
    .await;

    match applied {
        Ok(NormalizedSwap::Applied) => (
            StatusCode::OK,
            Json(json!({ "message": "Normalized file registered" })),
        ),
        Ok(NormalizedSwap::UnknownTrack) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("Unknown track: {}", original.display()) })),
        ),
        Ok(NormalizedSwap::PathTaken) => (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Normalized file already used by another track" })),
        ),
        Err(status) => (status, Json(json!({ "message": "Normalized file not registered" }))),
    }
}

async fn release_handler(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    with_gateway(&state.gateway, |gw| gw.player().release_resources()).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Resources released" }))))
}

#[cfg(test)]
mod tests;
