pub mod interaction;
pub mod message;
pub mod reaction;
pub mod ready;

use std::sync::Arc;

use crate::Error;
use crate::services::event_registry::EventHandlerRegistry;

/// Register all built-in event handlers with the registry
pub async fn register_builtin_handlers(registry: &EventHandlerRegistry) -> Result<(), Error> {
    registry.register(Arc::new(ready::ReadyHandler::new())).await?;
    registry.register(Arc::new(reaction::KaraokeReactionHandler::new())).await?;
    registry.register(Arc::new(interaction::InteractionHandler::new())).await?;
    registry.register(Arc::new(message::PrefixCommandHandler::new())).await?;
    Ok(())
}
