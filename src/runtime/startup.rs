use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::audio::AudioOutput;
use crate::config::Settings;
use crate::library;
use crate::player::Player;
use crate::state::StateStore;

/// Scan `folder`, build the player and resume the saved session.
pub fn build_player(
    settings: &Settings,
    folder: &Path,
    output: Box<dyn AudioOutput>,
    store: &dyn StateStore,
) -> anyhow::Result<Arc<Player>> {
    let tracks = library::scan(folder, &settings.library);
    let player = Player::new(tracks, output, &settings.playback)
        .with_context(|| format!("no playable files in {}", folder.display()))?;

    let saved = store.load();
    if saved.is_some() {
        info!("Resuming saved session");
    }
    let state = player.restore(saved);
    info!(
        "Ready at track {} ({}), paused: {}",
        state.current_index,
        state.current_track.as_deref().unwrap_or("-"),
        state.paused
    );
    store.save(&state);
    Ok(Arc::new(player))
}
