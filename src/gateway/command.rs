use thiserror::Error;

/// One control command received from a client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Next,
    Back,
    ToggleShuffle,
    PlayTrack(usize),
    Volume(f32),
    Delete(usize),
}

/// Why a command line was rejected. The display text is sent to the client as is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Invalid play command format")]
    MalformedPlay,
    #[error("Invalid volume command format")]
    MalformedVolume,
    #[error("Error deleting song: invalid index {0:?}")]
    MalformedDelete(String),
    #[error("Unknown command")]
    Unknown,
}

impl Command {
    /// Parse a single trimmed, lower-cased command line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        match line {
            "play" => return Ok(Self::Play),
            "pause" => return Ok(Self::Pause),
            "next" => return Ok(Self::Next),
            "back" => return Ok(Self::Back),
            "toggle-shuffle" => return Ok(Self::ToggleShuffle),
            _ => {}
        }

        let Some((verb, arg)) = line.split_once(':') else {
            return Err(CommandError::Unknown);
        };
        let arg = arg.trim();
        match verb {
            "play" => arg
                .parse()
                .map(Self::PlayTrack)
                .map_err(|_| CommandError::MalformedPlay),
            "volume" => arg
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Volume)
                .ok_or(CommandError::MalformedVolume),
            "delete" => arg
                .parse()
                .map(Self::Delete)
                .map_err(|_| CommandError::MalformedDelete(arg.to_string())),
            _ => Err(CommandError::Unknown),
        }
    }
}
