use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::Track;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Locate a normalized copy of `path` under `normalized_root`, keeping the
/// relative layout and accepting either an `.mp3` or a `.wav` rendition.
fn normalized_variant(root: &Path, normalized_root: &Path, path: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(root).ok()?;
    let base = normalized_root.join(rel);
    ["mp3", "wav"]
        .iter()
        .map(|ext| base.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Scan `dir` for playable files and build the catalog.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    info!("Scanning audio files in {}", dir.display());
    if !dir.is_dir() {
        warn!("Audio folder not found: {}", dir.display());
        return Vec::new();
    }

    let normalized_root = dir.join(&settings.normalized_dir);
    let mut tracks: Vec<Track> = Vec::new();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    let mut walker = WalkDir::new(dir)
        .follow_links(settings.follow_links)
        .sort_by_file_name();

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || ((settings.include_hidden || !is_hidden(e.path()))
                    && e.path() != normalized_root)
        })
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let mut title: Option<String> = None;
        let mut artist: Option<String> = None;
        let mut album: Option<String> = None;
        let mut duration: Option<Duration> = None;

        match lofty::read_from_path(path) {
            Ok(tagged) => {
                duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());

                if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                    title = tag.title().map(|v| v.to_string());
                    artist = tag.artist().map(|v| v.to_string());
                    album = tag.album().map(|v| v.to_string());
                }
            }
            Err(e) => debug!("No readable metadata for {}: {e}", path.display()),
        }

        let display_name = display_from_fields(
            path,
            title.as_deref(),
            artist.as_deref(),
            album.as_deref(),
            &settings.display_fields,
            &settings.display_separator,
        );

        // `song.ogg` and `song.wav` share one normalized rendition; only the first gets it.
        let (path, normalized) = match normalized_variant(dir, &normalized_root, path) {
            Some(normalized_path) if claimed.insert(normalized_path.clone()) => {
                (normalized_path, true)
            }
            Some(normalized_path) => {
                debug!(
                    "{} already used by another track, keeping {}",
                    normalized_path.display(),
                    path.display()
                );
                (path.to_path_buf(), false)
            }
            None => (path.to_path_buf(), false),
        };

        tracks.push(Track {
            path,
            display_name,
            duration,
            normalized,
        });
    }

    tracks.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
    });
    info!("Found {} audio files", tracks.len());
    tracks
}
