use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use super::history::{PlayHistory, RecentPaths, pick_next_index};
use super::{NormalizedSwap, Player, SavedState};
use crate::audio::fake::FakeOutput;
use crate::config::PlaybackSettings;
use crate::error::PlayerError;
use crate::library::Track;

fn tracks(names: &[&str]) -> Vec<Track> {
    names
        .iter()
        .map(|n| Track::new(PathBuf::from(format!("/music/{n}.mp3")), (*n).to_string()))
        .collect()
}

fn player_with(catalog: Vec<Track>) -> (Player, FakeOutput) {
    let out = FakeOutput::new();
    let player = Player::new(catalog, Box::new(out.clone()), &PlaybackSettings::default()).unwrap();
    (player, out)
}

fn started(names: &[&str]) -> (Player, FakeOutput) {
    let (player, out) = player_with(tracks(names));
    player.restore(None);
    (player, out)
}

/// Catalog backed by real files so deletes can touch the filesystem.
fn on_disk(names: &[&str]) -> (TempDir, Vec<Track>) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = names
        .iter()
        .map(|n| {
            let path = dir.path().join(format!("{n}.mp3"));
            std::fs::write(&path, b"not really audio").unwrap();
            Track::new(path, (*n).to_string())
        })
        .collect();
    (dir, catalog)
}

#[test]
fn new_rejects_empty_catalog() {
    let err = Player::new(
        Vec::new(),
        Box::new(FakeOutput::new()),
        &PlaybackSettings::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, PlayerError::EmptyCatalog));
}

#[test]
fn fresh_player_state_and_wraparound() {
    let (player, out) = started(&["A", "B", "C"]);

    let state = player.current_state();
    assert_eq!(state.current_index, 0);
    assert!(!state.paused);
    assert!(!state.shuffle_on);
    assert!((state.volume - 0.5).abs() < 1e-6);
    assert!(state.playing);
    assert_eq!(state.current_track.as_deref(), Some("A"));

    player.next().unwrap();
    let state = player.next().unwrap();
    assert_eq!(state.current_index, 2);

    let state = player.next().unwrap();
    assert_eq!(state.current_index, 0);
    assert_eq!(out.loaded().as_deref(), Some(Path::new("/music/A.mp3")));
}

#[test]
fn play_track_sets_index_for_every_valid_index() {
    let (player, out) = started(&["A", "B", "C", "D"]);
    for i in 0..4 {
        let state = player.play_track(i).unwrap();
        assert_eq!(state.current_index, i);
        assert_eq!(player.current_state().current_index, i);
        assert!(out.is_playing());
    }
}

#[test]
fn play_track_out_of_range_is_rejected_without_mutation() {
    let (player, out) = started(&["A", "B"]);
    let loads = out.state().loads.len();

    let err = player.play_track(2).unwrap_err();
    assert!(matches!(err, PlayerError::InvalidIndex { index: 2, len: 2 }));
    assert_eq!(player.current_state().current_index, 0);
    assert_eq!(out.state().loads.len(), loads);
}

#[test]
fn sequential_next_cycles_through_catalog() {
    let (player, _out) = started(&["A", "B", "C", "D", "E"]);
    player.play_track(3).unwrap();
    for _ in 0..5 {
        player.next().unwrap();
    }
    assert_eq!(player.current_state().current_index, 3);
}

#[test]
fn back_wraps_and_ignores_shuffle() {
    let (player, _out) = started(&["A", "B", "C"]);
    player.toggle_shuffle().unwrap();
    assert_eq!(player.back().unwrap().current_index, 2);
    assert_eq!(player.back().unwrap().current_index, 1);
}

#[test]
fn shuffle_does_not_repeat_within_five_calls() {
    let names: Vec<String> = (0..8).map(|i| format!("t{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (player, _out) = started(&refs);
    player.lock().reseed(7);
    player.toggle_shuffle().unwrap();

    let mut seen = vec![player.current_state().current_index];
    for _ in 0..60 {
        seen.push(player.next().unwrap().current_index);
    }
    for window in seen.windows(5) {
        let distinct: HashSet<_> = window.iter().collect();
        assert_eq!(distinct.len(), 5, "repeat in {window:?}");
    }
}

#[test]
fn shuffle_on_tiny_catalog_still_moves() {
    let (player, _out) = started(&["A", "B"]);
    player.toggle_shuffle().unwrap();
    for _ in 0..10 {
        let before = player.current_state().current_index;
        let after = player.next().unwrap().current_index;
        assert_ne!(before, after);
    }
}

#[test]
fn pause_toggles_and_resumes_without_reload() {
    let (player, out) = started(&["A", "B"]);
    let loads = out.state().loads.len();

    let state = player.pause().unwrap();
    assert!(state.paused);
    assert!(!state.playing);

    let state = player.pause().unwrap();
    assert!(!state.paused);
    assert!(state.playing);
    assert_eq!(out.state().loads.len(), loads);
}

#[test]
fn play_reloads_when_resume_leaves_output_idle() {
    let (player, out) = started(&["A", "B"]);
    player.pause().unwrap();
    out.state().resume_fails = true;
    let loads = out.state().loads.len();

    let state = player.play().unwrap();
    assert!(!state.paused);
    assert!(state.playing);
    assert_eq!(out.state().loads.len(), loads + 1);
}

#[test]
fn play_when_not_paused_restarts_current_track() {
    let (player, out) = started(&["A", "B"]);
    let loads = out.state().loads.len();
    player.play().unwrap();
    assert_eq!(out.state().loads.len(), loads + 1);
    assert_eq!(out.loaded().as_deref(), Some(Path::new("/music/A.mp3")));
}

#[test]
fn failed_load_keeps_previous_state() {
    let (player, out) = started(&["A", "B", "C"]);
    out.fail_on("/music/B.mp3");

    let err = player.next().unwrap_err();
    assert!(matches!(err, PlayerError::TrackLoad { .. }));
    let state = player.current_state();
    assert_eq!(state.current_index, 0);
    assert!(state.playing);
    assert_eq!(out.loaded().as_deref(), Some(Path::new("/music/A.mp3")));
}

#[test]
fn set_volume_is_reported_and_clamped() {
    let (player, _out) = started(&["A"]);
    let state = player.set_volume(0.3).unwrap();
    assert!((player.volume() - 0.3).abs() < 1e-6);
    assert!((state.volume - 0.3).abs() < 1e-6);

    player.set_volume(4.0).unwrap();
    assert!((player.volume() - 1.0).abs() < 1e-6);
    player.set_volume(-1.0).unwrap();
    assert!(player.volume().abs() < 1e-6);
}

#[test]
fn toggle_shuffle_keeps_current_index() {
    let (player, _out) = started(&["A", "B", "C"]);
    player.play_track(1).unwrap();
    let state = player.toggle_shuffle().unwrap();
    assert!(state.shuffle_on);
    assert_eq!(state.current_index, 1);
}

#[test]
fn restore_applies_saved_state() {
    let (player, out) = player_with(tracks(&["A", "B", "C"]));
    let state = player.restore(Some(SavedState {
        current_index: 2,
        shuffle_on: true,
        volume: 0.8,
        paused: true,
    }));
    assert_eq!(state.current_index, 2);
    assert!(state.shuffle_on);
    assert!(state.paused);
    assert!((state.volume - 0.8).abs() < 1e-6);
    assert_eq!(out.loaded().as_deref(), Some(Path::new("/music/C.mp3")));
    assert!(!out.is_playing());
}

#[test]
fn restore_clamps_stale_index() {
    let (player, _out) = player_with(tracks(&["A", "B"]));
    let state = player.restore(Some(SavedState {
        current_index: 9,
        ..SavedState::default()
    }));
    assert_eq!(state.current_index, 1);
    assert!(state.playing);
}

#[test]
fn delete_lower_index_shifts_current_without_touching_playback() {
    let (_dir, catalog) = on_disk(&["A", "B", "C"]);
    let (player, out) = player_with(catalog.clone());
    player.restore(None);
    player.play_track(2).unwrap();
    let loads = out.state().loads.len();

    let (state, remaining) = player.delete_track(0).unwrap();
    assert_eq!(state.current_index, 1);
    assert_eq!(remaining.len(), 2);
    assert!(!catalog[0].path.exists());
    assert_eq!(out.state().loads.len(), loads);
    assert_eq!(out.loaded().as_deref(), Some(catalog[2].path.as_path()));
}

#[test]
fn delete_current_starts_the_track_taking_its_slot() {
    let (_dir, catalog) = on_disk(&["A", "B", "C"]);
    let (player, out) = player_with(catalog.clone());
    player.restore(None);
    player.play_track(1).unwrap();

    let (state, remaining) = player.delete_track(1).unwrap();
    assert_eq!(remaining.len(), 2);
    assert_eq!(state.current_index, 1);
    assert_eq!(state.current_track.as_deref(), Some("C"));
    assert!(state.playing);
    assert_eq!(out.loaded().as_deref(), Some(catalog[2].path.as_path()));
}

#[test]
fn delete_current_last_slot_wraps_to_first() {
    let (_dir, catalog) = on_disk(&["A", "B", "C"]);
    let (player, out) = player_with(catalog.clone());
    player.restore(None);
    player.play_track(2).unwrap();

    let (state, _) = player.delete_track(2).unwrap();
    assert_eq!(state.current_index, 0);
    assert_eq!(out.loaded().as_deref(), Some(catalog[0].path.as_path()));
}

#[test]
fn delete_last_remaining_track_enters_empty_state() {
    let (_dir, catalog) = on_disk(&["A"]);
    let (player, out) = player_with(catalog);
    player.restore(None);

    let (state, remaining) = player.delete_track(0).unwrap();
    assert!(remaining.is_empty());
    assert_eq!(state.current_index, 0);
    assert!(state.paused);
    assert!(!state.playing);
    assert_eq!(state.current_track, None);
    assert!(out.loaded().is_none());

    assert!(matches!(player.next(), Err(PlayerError::EmptyCatalog)));
    assert!(matches!(player.play(), Err(PlayerError::EmptyCatalog)));
    assert!(player.pause().unwrap().paused);
}

#[test]
fn delete_missing_file_leaves_catalog_alone() {
    let (player, _out) = started(&["A", "B"]);
    let err = player.delete_track(1).unwrap_err();
    assert!(matches!(err, PlayerError::FileNotFound(_)));
    assert_eq!(player.tracks().len(), 2);
}

/// Catalog whose middle entry is a directory, so removing it fails after the pre-check.
fn with_undeletable_middle() -> (TempDir, Vec<Track>, PathBuf) {
    let (dir, mut catalog) = on_disk(&["A", "B", "C"]);
    let stuck = dir.path().join("B.d");
    std::fs::create_dir(&stuck).unwrap();
    catalog[1] = Track::new(stuck.clone(), "B".to_string());
    (dir, catalog, stuck)
}

#[test]
fn failed_removal_of_playing_track_restarts_it_and_keeps_catalog() {
    let (_dir, catalog, stuck) = with_undeletable_middle();
    let (player, out) = player_with(catalog.clone());
    player.restore(None);
    player.play_track(1).unwrap();
    let loads_before = out.state().loads.len();

    let err = player.delete_track(1).unwrap_err();

    assert!(matches!(err, PlayerError::Io { ref path, .. } if *path == stuck));
    assert_eq!(player.tracks(), catalog);
    assert!(stuck.is_dir());
    assert_eq!(out.loaded(), Some(stuck.clone()));
    assert!(out.is_playing());
    assert_eq!(out.state().loads.len(), loads_before + 1);
    let state = player.current_state();
    assert_eq!(state.current_index, 1);
    assert!(state.playing);
}

#[test]
fn failed_removal_of_paused_track_reloads_it_paused() {
    let (_dir, catalog, stuck) = with_undeletable_middle();
    let (player, out) = player_with(catalog.clone());
    player.restore(None);
    player.play_track(1).unwrap();
    player.pause().unwrap();

    assert!(player.delete_track(1).is_err());

    assert_eq!(player.tracks(), catalog);
    assert_eq!(out.loaded(), Some(stuck));
    assert!(!out.is_playing());
    assert!(player.current_state().paused);
}

#[test]
fn delete_out_of_range_is_invalid_index() {
    let (player, _out) = started(&["A"]);
    assert!(matches!(
        player.delete_track(5),
        Err(PlayerError::InvalidIndex { index: 5, len: 1 })
    ));
}

#[test]
fn concurrent_next_never_double_advances() {
    let (player, out) = started(&["A", "B", "C", "D", "E", "F", "G"]);
    let player = Arc::new(player);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let p = Arc::clone(&player);
            thread::spawn(move || {
                for _ in 0..3 {
                    p.next().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let state = player.current_state();
    assert_eq!(state.current_index, 6);
    let tracks = player.tracks();
    assert_eq!(
        out.loaded().as_deref(),
        Some(tracks[state.current_index].path.as_path())
    );
}

#[test]
fn advance_after_end_moves_on_once() {
    let (player, out) = started(&["A", "B", "C"]);
    let probe = player.probe();
    out.finish_track();

    let state = player.advance_after_end(probe.generation).unwrap().unwrap();
    assert_eq!(state.current_index, 1);
    // A second caller holding the old generation must not advance again.
    assert!(player.advance_after_end(probe.generation).is_none());
}

#[test]
fn advance_after_end_skips_broken_tracks() {
    let (player, out) = started(&["A", "B", "C"]);
    out.fail_on("/music/B.mp3");
    let probe = player.probe();
    out.finish_track();

    let state = player.advance_after_end(probe.generation).unwrap().unwrap();
    assert_eq!(state.current_index, 2);
}

#[test]
fn advance_after_end_gives_up_when_nothing_loads() {
    let (player, out) = started(&["A", "B"]);
    out.fail_on("/music/A.mp3");
    out.fail_on("/music/B.mp3");
    let probe = player.probe();
    out.finish_track();

    let result = player.advance_after_end(probe.generation).unwrap();
    assert!(matches!(result, Err(PlayerError::TrackLoad { .. })));
    assert!(player.current_state().paused);
}

#[test]
fn advance_after_end_ignores_paused_player() {
    let (player, out) = started(&["A", "B"]);
    player.pause().unwrap();
    let probe = player.probe();
    out.finish_track();
    assert!(player.advance_after_end(probe.generation).is_none());
}

#[test]
fn replace_catalog_follows_current_path() {
    let (player, _out) = started(&["A", "B", "C"]);
    player.play_track(1).unwrap();

    let (state, list) = player.replace_catalog(tracks(&["0", "A", "B", "C"]));
    assert_eq!(list.len(), 4);
    assert_eq!(state.current_index, 2);
    assert!(state.playing);

    let (state, _) = player.replace_catalog(tracks(&["X", "Y"]));
    assert_eq!(state.current_index, 0);
    assert!(state.paused);
}

#[test]
fn apply_normalized_swaps_path() {
    let (player, _out) = started(&["A", "B"]);
    assert_eq!(
        player.apply_normalized(Path::new("/music/B.mp3"), Path::new("/music/normalized/B.mp3")),
        NormalizedSwap::Applied
    );
    assert_eq!(
        player.apply_normalized(Path::new("/music/nope.mp3"), Path::new("/x.mp3")),
        NormalizedSwap::UnknownTrack
    );

    let list = player.tracks();
    assert_eq!(list[1].path, PathBuf::from("/music/normalized/B.mp3"));
    assert!(list[1].normalized);
}

#[test]
fn apply_normalized_keeps_catalog_paths_unique() {
    let (player, _out) = started(&["song", "other"]);
    let shared = Path::new("/music/normalized/song.mp3");

    assert_eq!(
        player.apply_normalized(Path::new("/music/song.mp3"), shared),
        NormalizedSwap::Applied
    );
    assert_eq!(
        player.apply_normalized(Path::new("/music/other.mp3"), shared),
        NormalizedSwap::PathTaken
    );

    let list = player.tracks();
    assert_eq!(list[1].path, PathBuf::from("/music/other.mp3"));
    assert!(!list[1].normalized);
    let paths: HashSet<_> = list.iter().map(|t| &t.path).collect();
    assert_eq!(paths.len(), list.len());
}

#[test]
fn release_resources_asks_output_to_drop_idle_buffers() {
    let (player, out) = started(&["A"]);
    player.release_resources();
    player.release_resources();
    assert_eq!(out.state().releases, 2);
}

#[test]
fn cleanup_is_idempotent_and_closes_player() {
    let (player, out) = started(&["A", "B"]);
    player.cleanup(Duration::ZERO);
    player.cleanup(Duration::ZERO);
    assert_eq!(out.state().shutdowns, 1);
    assert!(matches!(player.next(), Err(PlayerError::Closed)));
    assert!(matches!(player.set_volume(0.1), Err(PlayerError::Closed)));
}

#[test]
fn history_is_bounded_and_shifts_on_removal() {
    let mut h = PlayHistory::new(3);
    for i in [4, 1, 6, 2] {
        h.push(i);
    }
    assert_eq!(h.len(), 3);
    h.remove_index(2);
    assert_eq!(h.recent(5).collect::<Vec<_>>(), vec![1, 5]);
}

#[test]
fn history_caps_at_ten_by_default() {
    let (player, _out) = started(&["A", "B", "C"]);
    for _ in 0..25 {
        player.next().unwrap();
    }
    assert_eq!(player.lock().history_len(), 10);
}

#[test]
fn recent_paths_evicts_oldest() {
    let mut cache = RecentPaths::new(2);
    assert!(cache.touch(Path::new("/a")).is_empty());
    assert!(cache.touch(Path::new("/b")).is_empty());
    assert!(cache.touch(Path::new("/a")).is_empty());
    assert_eq!(cache.touch(Path::new("/c")), vec![PathBuf::from("/b")]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn pick_next_index_falls_back_when_everything_is_recent() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let i = pick_next_index(1, 3, true, &[0, 1, 2], &mut rng);
        assert_ne!(i, 1);
        assert!(i < 3);
    }
    assert_eq!(pick_next_index(2, 3, false, &[0], &mut rng), 0);
}

#[test]
fn set_paused_only_acts_on_a_change() {
    let (player, out) = started(&["A", "B"]);
    assert!(player.set_paused(false).unwrap().is_none());

    let state = player.set_paused(true).unwrap().unwrap();
    assert!(state.paused);
    assert!(!out.is_playing());
    assert!(player.set_paused(true).unwrap().is_none());

    let state = player.set_paused(false).unwrap().unwrap();
    assert!(state.playing);
}

#[test]
fn try_current_state_gives_up_while_locked() {
    let (player, _out) = started(&["A"]);
    let guard = player.lock();
    assert!(player.try_current_state().is_none());
    drop(guard);
    assert_eq!(player.try_current_state().unwrap().current_index, 0);
}
