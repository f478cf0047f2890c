pub mod karaoke;
pub mod lyrics;
pub mod settings;

pub use karaoke::{ChatMessage, ControlOp, ReactionEvent, SessionState};
pub use lyrics::Song;
pub use settings::{ChannelSettings, SettingsKey};
