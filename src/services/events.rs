//! Domain events
//!
//! Services publish an event after the state change it describes has been
//! persisted. Listeners run in registration order, one after another, and a
//! failing listener is logged without stopping the rest.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::BlogPost;

#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A blog post row was inserted. Raised once per post, never on update.
    PostCreated { post: BlogPost },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::PostCreated { .. } => "post_created",
        }
    }
}

#[async_trait]
pub trait EventListener: Send + Sync {
    /// Listener name for logs
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        tracing::debug!(listener = listener.name(), "Event listener registered");
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub async fn publish(&self, event: DomainEvent) {
        for listener in &self.listeners {
            if let Err(e) = listener.handle(&event).await {
                tracing::warn!(
                    event = event.name(),
                    listener = listener.name(),
                    error = %e,
                    "Event listener failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventListener for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
            let DomainEvent::PostCreated { post } = event;
            self.log.lock().unwrap().push(format!("{}:{}", self.label, post.slug));
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn post() -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: 1,
            title: "Hello".into(),
            slug: "hello".into(),
            excerpt: String::new(),
            content: String::new(),
            cover_image: None,
            category_id: None,
            is_published: true,
            meta_title: String::new(),
            meta_description: String::new(),
            meta_keywords: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_stop_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(Arc::new(Recorder { label: "first", log: log.clone(), fail: true }));
        bus.subscribe(Arc::new(Recorder { label: "second", log: log.clone(), fail: false }));
        assert_eq!(bus.listener_count(), 2);

        bus.publish(DomainEvent::PostCreated { post: post() }).await;

        assert_eq!(*log.lock().unwrap(), vec!["first:hello", "second:hello"]);
    }
}
