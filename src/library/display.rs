use std::path::Path;

use crate::config::TrackDisplayField;

/// Build a display name for a track according to the provided `fields` and separator.
///
/// This composes metadata fields (artist, title, album, file name, path) in the
/// configured order and falls back to the file name when no parts were produced.
pub fn display_from_fields(
    path: &Path,
    title: Option<&str>,
    artist: Option<&str>,
    album: Option<&str>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    let non_empty = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from);

    for f in fields {
        match f {
            TrackDisplayField::FileName => {
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    parts.push(name.to_string());
                }
            }
            TrackDisplayField::Title => parts.extend(non_empty(title)),
            TrackDisplayField::Artist => parts.extend(non_empty(artist)),
            TrackDisplayField::Album => parts.extend(non_empty(album)),
            TrackDisplayField::Stem => {
                parts.extend(non_empty(path.file_stem().and_then(|s| s.to_str())));
            }
            TrackDisplayField::Path => {
                parts.push(path.display().to_string());
            }
        }
    }

    if parts.is_empty() {
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string()
    } else {
        parts.join(sep)
    }
}
