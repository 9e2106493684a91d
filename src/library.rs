//! Track catalog types and the music folder scanner.
//!
//! The scanner produces the catalog handed to the player at startup and on
//! rescans; `format_duration` renders durations for the song list.

mod display;
mod model;
mod scan;

pub use model::{Track, format_duration};
pub use scan::scan;
