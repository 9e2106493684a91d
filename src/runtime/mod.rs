use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::RodioOutput;
use crate::gateway::Gateway;
use crate::http::{self, AppState};
use crate::state::{JsonStateFile, StateStore};

mod logging;
mod memory;
mod scheduler;
mod settings;
mod shutdown;
mod startup;
mod watchdog;
mod watcher;

use shutdown::Shutdown;
use watchdog::Heartbeat;

// Extra time allowed for cleanup beyond the quit fade.
const CLEANUP_GRACE: Duration = Duration::from_secs(5);
// How long a background loop may take to notice shutdown before it is aborted.
const TASK_JOIN_GRACE: Duration = Duration::from_secs(2);

/// Run the server until a signal or the watchdog stops it. Returns the process exit code.
pub async fn run() -> anyhow::Result<i32> {
    let (settings, problem) = settings::load_settings();
    logging::init(&settings.logging.filter);
    if let Some(problem) = problem {
        warn!("{problem}; using defaults");
    }

    let folder = settings::music_folder(env::args().nth(1), &settings);
    let state_file = JsonStateFile::new(settings.state_path());
    info!("State file: {}", state_file.path().display());
    let store: Arc<dyn StateStore> = Arc::new(state_file);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;

    let output = RodioOutput::open().context("cannot open audio output")?;
    let player = startup::build_player(&settings, &folder, Box::new(output), store.as_ref())?;
    let gateway = Arc::new(Gateway::new(player, Arc::clone(&store)));

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown::listen_for_signals(shutdown.clone()));

    let heartbeat = Arc::new(Heartbeat::new(Instant::now()));
    let mut tasks = vec![
        tokio::spawn(watcher::run(
            Arc::clone(&gateway),
            settings.watcher.clone(),
            shutdown.token(),
        )),
        tokio::spawn(watchdog::run_heartbeat(
            Arc::clone(&gateway),
            Arc::clone(&heartbeat),
            settings.watchdog.clone(),
            shutdown.clone(),
        )),
        tokio::spawn(watchdog::run_monitor(
            Arc::clone(&gateway),
            heartbeat,
            settings.watchdog.clone(),
            shutdown.clone(),
        )),
    ];
    if settings.memory.enabled {
        tasks.push(tokio::spawn(memory::run(
            Arc::clone(&gateway),
            settings.memory.clone(),
            shutdown.token(),
        )));
    }
    if settings.scheduler.enabled {
        tasks.push(tokio::spawn(scheduler::run(
            Arc::clone(&gateway),
            settings.scheduler.clone(),
            shutdown.token(),
        )));
    }

    let app = http::router(AppState {
        gateway: Arc::clone(&gateway),
        folder: Arc::new(folder),
        library: Arc::new(settings.library.clone()),
    });
    info!("Listening on http://{addr}");

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.wait().await })
        .await;
    shutdown.request(0, "server stopped");

    join_background(tasks, TASK_JOIN_GRACE).await;

    finish(&gateway, Duration::from_millis(settings.audio.quit_fade_out_ms)).await;
    served.context("server error")?;
    Ok(shutdown.exit_code())
}

/// Wait for the background loops, aborting any that outlive `grace`.
async fn join_background(tasks: Vec<JoinHandle<()>>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    for mut task in tasks {
        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Background task failed: {e}"),
            Err(_) => {
                warn!("Background task did not stop in time, aborting it");
                task.abort();
            }
        }
    }
}

/// Stop the player once and persist the last state it reported.
async fn finish(gateway: &Arc<Gateway>, fade_out: Duration) {
    let gw = Arc::clone(gateway);
    let cleanup = tokio::task::spawn_blocking(move || {
        let state = gw.player().current_state();
        gw.player().cleanup(fade_out);
        state
    });

    match tokio::time::timeout(fade_out + CLEANUP_GRACE, cleanup).await {
        Ok(Ok(state)) => {
            gateway.persist(&state);
            info!("Shutdown complete");
        }
        Ok(Err(e)) => error!("Player cleanup panicked: {e}"),
        Err(_) => error!("Player cleanup timed out"),
    }
}
