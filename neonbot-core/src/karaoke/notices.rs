//! User-visible channel texts produced by the karaoke engine.

use neonbot_common::models::{ControlOp, Song};

pub fn control_surface(song: &Song, delay_secs: f64) -> String {
    format!(
        "\u{1F3B6} Now singing **{}** - {}\nOne line every {}s. React {} to pause, {} to resume, {} to stop.",
        song.title,
        song.artist,
        delay_secs,
        ControlOp::Pause.glyph(),
        ControlOp::Resume.glyph(),
        ControlOp::Stop.glyph(),
    )
}

pub fn started(title: &str) -> String {
    format!("\u{1F3A4} Karaoke starting: **{title}**")
}

pub fn finished(title: &str) -> String {
    format!("\u{2705} Finished **{title}**. Thanks for singing!")
}

pub const PAUSED: &str = "\u{23F8}\u{FE0F} Karaoke paused.";
pub const RESUMED: &str = "\u{25B6}\u{FE0F} Karaoke resumed.";
pub const STOPPED: &str = "\u{23F9}\u{FE0F} Karaoke stopped.";
pub const CANCELLED: &str = "\u{23ED}\u{FE0F} Karaoke cancelled.";
pub const DELIVERY_FAILED: &str =
    "\u{26A0}\u{FE0F} Karaoke ended early: a line could not be sent to this channel.";
pub const NOTHING_RUNNING: &str = "Nothing is playing in this channel.";
