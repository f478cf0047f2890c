pub mod output;
pub mod runtime;

pub use output::DiscordOutput;
pub use runtime::DiscordPlatform;
