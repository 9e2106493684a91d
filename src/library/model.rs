use std::path::PathBuf;
use std::time::Duration;

/// One playable entry of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub path: PathBuf,
    pub display_name: String,
    /// `None` until the duration could be read from the file.
    pub duration: Option<Duration>,
    /// Whether `path` points at a loudness-normalized copy.
    pub normalized: bool,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>, display_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
            duration: None,
            normalized: false,
        }
    }
}

/// Render a duration as `m:ss`, or `--:--` when unknown.
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => {
            let secs = d.as_secs();
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        None => "--:--".to_string(),
    }
}
