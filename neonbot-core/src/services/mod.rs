pub mod command_service;
pub mod discord;
pub mod event_context;
pub mod event_handler;
pub mod event_handlers;
pub mod event_registry;

pub use command_service::{CommandResponse, CommandService};
pub use discord::DiscordEventService;
pub use event_context::EventContext;
pub use event_handler::EventHandler;
pub use event_registry::EventHandlerRegistry;
