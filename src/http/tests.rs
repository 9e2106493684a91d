use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use super::{AppState, router};
use crate::audio::fake::FakeOutput;
use crate::config::{LibrarySettings, PlaybackSettings};
use crate::gateway::Gateway;
use crate::library::Track;
use crate::player::Player;
use crate::state::MemoryStore;

fn app_state(folder: PathBuf, catalog: Vec<Track>) -> (AppState, FakeOutput) {
    let out = FakeOutput::new();
    let player = Player::new(catalog, Box::new(out.clone()), &PlaybackSettings::default()).unwrap();
    player.restore(None);
    let gateway = Arc::new(Gateway::new(
        Arc::new(player),
        Arc::new(MemoryStore::default()),
    ));
    let state = AppState {
        gateway,
        folder: Arc::new(folder),
        library: Arc::new(LibrarySettings::default()),
    };
    (state, out)
}

fn catalog() -> Vec<Track> {
    vec![
        Track::new("/music/a.mp3", "a.mp3"),
        Track::new("/music/b.mp3", "b.mp3"),
    ]
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn status_returns_snapshot() {
    let (state, _out) = app_state(PathBuf::from("/music"), catalog());
    let response = router(state)
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["current_index"], 0);
    assert_eq!(body["current_track"], "a.mp3");
    assert_eq!(body["playing"], true);
}

#[tokio::test]
async fn songs_lists_catalog() {
    let (state, _out) = app_state(PathBuf::from("/music"), catalog());
    let response = router(state)
        .oneshot(Request::get("/api/songs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = body_json(response).await;
    let songs = body.as_array().unwrap();
    assert_eq!(songs.len(), 2);
    assert_eq!(songs[1]["name"], "b.mp3");
    assert_eq!(songs[1]["duration"], "--:--");
}

#[tokio::test]
async fn rescan_replaces_catalog_from_folder() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["x.mp3", "y.wav", "z.mp3", "notes.txt"] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }
    let (state, _out) = app_state(dir.path().to_path_buf(), catalog());
    let gateway = Arc::clone(&state.gateway);

    let response = router(state)
        .oneshot(Request::post("/api/rescan").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["songs"].as_array().unwrap().len(), 3);
    assert_eq!(body["state"]["paused"], true);
    assert_eq!(gateway.player().tracks().len(), 3);
}

#[tokio::test]
async fn normalized_swaps_known_path_and_rejects_unknown() {
    let (state, _out) = app_state(PathBuf::from("/music"), catalog());
    let gateway = Arc::clone(&state.gateway);
    let app = router(state);

    let request = |original: &str| {
        Request::post("/api/normalized")
            .header("content-type", "application/json")
            .body(Body::from(format!(
                r#"{{"original": "{original}", "normalized": "/music/normalized/b.mp3"}}"#
            )))
            .unwrap()
    };

    let response = app.clone().oneshot(request("/music/b.mp3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tracks = gateway.player().tracks();
    assert_eq!(tracks[1].path, PathBuf::from("/music/normalized/b.mp3"));
    assert!(tracks[1].normalized);

    let response = app.oneshot(request("/music/missing.mp3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("missing.mp3"));
}

#[tokio::test]
async fn release_drops_idle_resources() {
    let (state, out) = app_state(PathBuf::from("/music"), catalog());
    let response = router(state)
        .oneshot(Request::post("/api/release").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(out.state().releases, 1);
}

#[tokio::test]
async fn status_waits_for_a_busy_player_without_stalling_the_runtime() {
    let (state, out) = app_state(PathBuf::from("/music"), catalog());
    let gateway = Arc::clone(&state.gateway);

    let wedge = out.wedge();
    let gw = Arc::clone(&gateway);
    let stuck = std::thread::spawn(move || {
        let _ = gw.player().next();
    });
    while gateway.player().try_current_state().is_some() {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    let request = tokio::spawn(
        router(state).oneshot(Request::get("/api/status").body(Body::empty()).unwrap()),
    );
    // Timers still fire on this single-threaded runtime while the request waits.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!request.is_finished());

    drop(wedge);
    stuck.join().unwrap();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["current_index"], 1);
}
