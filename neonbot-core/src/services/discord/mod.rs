pub mod discord_event_service;
pub mod slashcommands;

pub use discord_event_service::DiscordEventService;
