use std::path::PathBuf;

use crate::config;

/// Load and validate settings. Config is optional: on any problem the
/// defaults are used and the problem is returned for logging once the
/// subscriber is up.
pub fn load_settings() -> (config::Settings, Option<String>) {
    match config::Settings::load() {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(msg) => (
                config::Settings::default(),
                Some(format!("invalid config: {msg}")),
            ),
        },
        Err(e) => (
            config::Settings::default(),
            Some(format!("failed to load config: {e}")),
        ),
    }
}

/// Music folder: first CLI argument, then `library.folder`, then the working directory.
pub fn music_folder(arg: Option<String>, settings: &config::Settings) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| settings.library.folder.clone())
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"))
}
