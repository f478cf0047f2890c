use async_trait::async_trait;

use crate::Error;
use crate::eventbus::BotEvent;
use crate::services::event_context::EventContext;

/// Base trait for all event handlers in the system.
/// Handlers process BotEvents and can access services through EventContext.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns a unique identifier for this handler
    fn id(&self) -> &str;

    /// Returns the event type(s) this handler can process (see `BotEvent::event_type`)
    fn event_types(&self) -> Vec<&'static str>;

    /// Process the event. Return Ok(true) if handled, Ok(false) if skipped.
    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error>;

    /// Priority for this handler (lower numbers run first)
    fn priority(&self) -> i32 {
        100
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Metadata about an event handler for listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHandlerInfo {
    pub id: String,
    pub event_types: Vec<&'static str>,
    pub priority: i32,
    pub enabled: bool,
}
