//! Audio output.
//!
//! The player talks to an [`AudioOutput`]. The production implementation,
//! [`RodioOutput`], owns a rodio stream on a dedicated thread and is driven
//! by [`types::AudioCmd`] messages.

mod output;
mod sink;
mod thread;
mod types;

#[cfg(test)]
pub mod fake;

pub use output::{AudioOutput, RodioOutput};
pub use types::{OutputError, OutputStatus};
