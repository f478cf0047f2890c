//! Karaoke playback engine.
//!
//! One [`KaraokeSession`] per channel lives in the [`SessionRegistry`]. The
//! [`KaraokeLauncher`] creates sessions and starts the playback driver task;
//! [`KaraokeControl`] turns reactions and commands into pause/resume/stop.
//!
//! Control is eventually applied: a pause or stop takes effect at the
//! driver's next suspension point (between lines, or within one pause poll
//! interval while paused). A line whose send is already in flight when a
//! stop arrives may still appear.

pub mod control;
pub mod driver;
pub mod launcher;
pub mod notices;
pub mod registry;
pub mod session;

use std::time::Duration;

use crate::Error;

pub use control::{ControlOutcome, KaraokeControl};
pub use launcher::{KaraokeLauncher, LaunchRequest};
pub use registry::SessionRegistry;
pub use session::{EndReason, KaraokeSession, Transition};

pub const MIN_DELAY_SECS: f64 = 0.1;
pub const MAX_DELAY_SECS: f64 = 10.0;
/// Used when neither the command nor the settings store supplies a delay.
pub const DEFAULT_DELAY_SECS: f64 = 2.0;

/// How often a paused driver re-checks its session.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Consecutive transient send failures tolerated before playback gives up.
pub const MAX_TRANSIENT_FAILURES: u32 = 3;

/// Accepts delays in `[0.1, 10.0]` seconds, inclusive.
pub fn validate_delay(delay_secs: f64) -> Result<f64, Error> {
    if delay_secs.is_finite() && (MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&delay_secs) {
        Ok(delay_secs)
    } else {
        Err(Error::Validation(format!(
            "Delay must be between {MIN_DELAY_SECS} and {MAX_DELAY_SECS} seconds (got {delay_secs})."
        )))
    }
}
