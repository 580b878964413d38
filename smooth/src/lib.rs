//! Phase-averaging smoother for CTC network output.
//!
//! A CTC network evaluated on frame-subsampled features emits one output
//! frame per N input frames. Running it N times, once per subsampling
//! offset, and averaging the N outputs frame by frame gives smoother
//! posteriors:
//!
//! ```text
//! feats | subsample-feats --n=N --offset=0 | scorer ─┐
//! feats | subsample-feats --n=N --offset=1 | scorer ─┼─ lockstep ─ mean ─ stdout
//!   ...                                              │
//! feats | subsample-feats --n=N --offset=N-1 | scorer┘
//! ```
//!
//! - [`build_commands`] constructs the N scorer pipelines.
//! - [`Lockstep`] reads the N archives one record at a time each.
//! - [`average_frames`] truncates to the last phase's length and averages.
//! - [`Smoother`] ties these together and writes the result.

mod average;
mod command;
pub mod config;
mod error;
mod lockstep;
mod smoother;

pub use average::average_frames;
pub use command::{build_commands, score_command, subsample_stage};
pub use config::{Overrides, SmoothConfig, MAX_STREAMS};
pub use error::{SmoothError, SmoothResult};
pub use lockstep::Lockstep;
pub use smoother::{smooth_streams, RunStats, Smoother};

#[cfg(test)]
mod tests;
