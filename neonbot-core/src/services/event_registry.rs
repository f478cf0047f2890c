use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Error;
use crate::eventbus::BotEvent;
use crate::services::event_handler::{EventHandler, EventHandlerInfo};

/// Registry for event handlers, organised by event type and sorted by priority.
#[derive(Default)]
pub struct EventHandlerRegistry {
    /// event_type -> handlers sorted by priority
    handlers: RwLock<HashMap<&'static str, Vec<Arc<dyn EventHandler>>>>,
    /// handler id -> handler
    handlers_by_id: RwLock<HashMap<String, Arc<dyn EventHandler>>>,
}

impl EventHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new event handler
    pub async fn register(&self, handler: Arc<dyn EventHandler>) -> Result<(), Error> {
        let handler_id = handler.id().to_string();
        let event_types = handler.event_types();
        let priority = handler.priority();

        info!(
            "Registering event handler '{}' for events {:?} with priority {}",
            handler_id, event_types, priority
        );

        {
            let mut id_map = self.handlers_by_id.write().await;
            if id_map.contains_key(&handler_id) {
                return Err(Error::Platform(format!(
                    "Handler with ID '{}' already registered",
                    handler_id
                )));
            }
            id_map.insert(handler_id.clone(), handler.clone());
        }

        let mut handlers_map = self.handlers.write().await;
        for event_type in event_types {
            let handler_list = handlers_map.entry(event_type).or_default();

            // Insert in priority order (lower priority numbers first)
            let insert_pos = handler_list.partition_point(|h| h.priority() <= priority);
            handler_list.insert(insert_pos, handler.clone());

            debug!(
                "Handler '{}' registered for {} at position {}",
                handler_id, event_type, insert_pos
            );
        }

        Ok(())
    }

    /// Enabled handlers for this event, in priority order.
    pub async fn get_handlers_for_event(&self, event: &BotEvent) -> Vec<Arc<dyn EventHandler>> {
        let handlers = self.handlers.read().await;
        handlers
            .get(event.event_type())
            .map(|list| list.iter().filter(|h| h.is_enabled()).cloned().collect())
            .unwrap_or_default()
    }

    /// List all registered handlers
    pub async fn list_handlers(&self) -> Vec<EventHandlerInfo> {
        let handlers = self.handlers_by_id.read().await;
        let mut infos: Vec<EventHandlerInfo> = handlers
            .values()
            .map(|h| EventHandlerInfo {
                id: h.id().to_string(),
                event_types: h.event_types(),
                priority: h.priority(),
                enabled: h.is_enabled(),
            })
            .collect();
        infos.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::services::event_context::EventContext;

    struct TestHandler {
        id: &'static str,
        priority: i32,
    }

    #[async_trait]
    impl EventHandler for TestHandler {
        fn id(&self) -> &str {
            self.id
        }

        fn event_types(&self) -> Vec<&'static str> {
            vec!["ready"]
        }

        async fn handle(&self, _event: &BotEvent, _ctx: &EventContext) -> Result<bool, Error> {
            Ok(true)
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[tokio::test]
    async fn handlers_come_back_in_priority_order() {
        let registry = EventHandlerRegistry::new();
        registry.register(Arc::new(TestHandler { id: "late", priority: 90 })).await.unwrap();
        registry.register(Arc::new(TestHandler { id: "early", priority: 10 })).await.unwrap();
        registry.register(Arc::new(TestHandler { id: "middle", priority: 50 })).await.unwrap();

        let event = BotEvent::Ready {
            bot_user_id: twilight_model::id::Id::new(1),
            application_id: twilight_model::id::Id::new(2),
            shard_id: 0,
        };
        let ids: Vec<String> = registry
            .get_handlers_for_event(&event)
            .await
            .iter()
            .map(|h| h.id().to_string())
            .collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let registry = EventHandlerRegistry::new();
        registry.register(Arc::new(TestHandler { id: "a", priority: 1 })).await.unwrap();
        let err = registry
            .register(Arc::new(TestHandler { id: "a", priority: 2 }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Platform(_)));
        assert_eq!(registry.list_handlers().await.len(), 1);
    }
}
