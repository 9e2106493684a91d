use std::time::Duration;

mod audio;
mod config;
mod error;
mod gateway;
mod http;
mod library;
mod player;
mod runtime;
mod state;

// Blocking work still stuck on the player lock is abandoned after this.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = rt.block_on(runtime::run());
    rt.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    let exit_code = outcome?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
