//! Command gateway.
//!
//! Turns client text commands into player calls and fans state changes out
//! to every connected client. The WebSocket transport lives in [`session`];
//! everything else here is synchronous so it can be driven from tests and
//! from blocking tasks alike.

mod command;
mod hub;
pub mod session;
mod wire;

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use crate::library::Track;
use crate::player::{Player, Snapshot};
use crate::state::StateStore;

pub use command::{Command, CommandError};
pub use hub::{ClientHub, ClientId};
pub use wire::{Outgoing, song_list};

pub struct Gateway {
    player: Arc<Player>,
    store: Arc<dyn StateStore>,
    hub: ClientHub,
}

impl Gateway {
    pub fn new(player: Arc<Player>, store: Arc<dyn StateStore>) -> Self {
        Self {
            player,
            store,
            hub: ClientHub::new(),
        }
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    pub fn hub(&self) -> &ClientHub {
        &self.hub
    }

    /// First message on a new connection: state plus the song list.
    pub fn welcome(&self) -> String {
        let (state, tracks) = self.player.view();
        Outgoing::catalog(state, song_list(&tracks)).to_json()
    }

    /// Register a new client, then queue its welcome.
    ///
    /// Registering first means any state published meanwhile is either in
    /// the welcome or delivered after it.
    pub fn join(&self, sink: UnboundedSender<String>) -> ClientId {
        let id = self.hub.register(sink.clone());
        let _ = sink.send(self.welcome());
        id
    }

    /// Handle one text frame from `origin`, returning the replies for that client.
    ///
    /// A frame may hold several newline-separated commands.
    pub fn handle_message(&self, origin: ClientId, text: &str) -> Vec<String> {
        self.hub.touch();
        text.lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .map(|line| self.handle_command(origin, &line))
            .collect()
    }

    fn handle_command(&self, origin: ClientId, line: &str) -> String {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejected command {line:?}: {e}");
                return Outgoing::message(e.to_string()).to_json();
            }
        };

        let outcome = match command {
            Command::Play => self.player.play(),
            Command::Pause => self.player.pause(),
            Command::Next => self.player.next(),
            Command::Back => self.player.back(),
            Command::ToggleShuffle => self.player.toggle_shuffle(),
            Command::PlayTrack(index) => self.player.play_track(index),
            Command::Volume(volume) => self.player.set_volume(volume),
            Command::Delete(index) => return self.delete(origin, index),
        };

        match outcome {
            Ok(state) => {
                self.store.save(&state);
                let reply = Outgoing::state(state).to_json();
                self.hub.broadcast_except(origin, &reply);
                reply
            }
            Err(e) => {
                warn!("Command {line:?} failed: {e}");
                Outgoing::message(e.to_string()).to_json()
            }
        }
    }

    fn delete(&self, origin: ClientId, index: usize) -> String {
        match self.player.delete_track(index) {
            Ok((state, tracks)) => {
                self.store.save(&state);
                let update = Outgoing::catalog(state, song_list(&tracks));
                self.hub.broadcast_except(origin, &update.to_json());
                update.with_message("Song deleted.").to_json()
            }
            Err(e) => {
                error!("Error deleting song {index}: {e}");
                Outgoing::message(format!("Error deleting song: {e}")).to_json()
            }
        }
    }

    /// Persist `state` and push it to every client.
    pub fn publish_state(&self, state: &Snapshot) {
        self.store.save(state);
        self.hub.broadcast(&Outgoing::state(state.clone()).to_json());
    }

    /// Persist `state` and push it with the song list to every client.
    pub fn publish_catalog(&self, state: &Snapshot, tracks: &[Track]) {
        self.store.save(state);
        let update = Outgoing::catalog(state.clone(), song_list(tracks));
        self.hub.broadcast(&update.to_json());
        info!("Published catalog of {} tracks", tracks.len());
    }

    pub fn persist(&self, state: &Snapshot) {
        self.store.save(state);
    }
}
