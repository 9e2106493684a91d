use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Process-wide stop signal plus the exit code to leave with.
#[derive(Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    exit_code: Arc<AtomicI32>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Ask every loop to stop. The first non-zero code wins.
    pub fn request(&self, exit_code: i32, reason: &str) {
        if exit_code != 0 {
            let _ = self
                .exit_code
                .compare_exchange(0, exit_code, Ordering::SeqCst, Ordering::SeqCst);
        }
        if !self.token.is_cancelled() {
            info!("Shutdown requested: {reason}");
        }
        self.token.cancel();
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
pub async fn listen_for_signals(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => shutdown.request(0, "Ctrl+C"),
        _ = terminate => shutdown.request(0, "terminate signal"),
        _ = shutdown.wait() => {}
    }
}
