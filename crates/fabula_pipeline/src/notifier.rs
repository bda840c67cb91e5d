//! Broadcast-channel notifier.

use fabula_interface::{GenerationEvent, Notifier};
use tokio::sync::broadcast;

/// [`Notifier`] fanning events out over a tokio broadcast channel.
///
/// The server subscribes per realtime connection and filters by user id.
/// Emitting with no subscribers is fine; delivery is best-effort and the
/// job row remains the durable record.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<(i32, GenerationEvent)>,
}

impl BroadcastNotifier {
    /// Create a notifier with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the event stream. Each item is the addressed user id
    /// and the event.
    pub fn subscribe(&self) -> broadcast::Receiver<(i32, GenerationEvent)> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Notifier for BroadcastNotifier {
    fn emit(&self, user_id: i32, event: GenerationEvent) {
        tracing::debug!(user_id, event = event.name(), "emitting generation event");
        // Err here only means no live subscribers.
        let _ = self.tx.send((user_id, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();
        notifier.emit(7, GenerationEvent::MetaGenerated { story_id: 3 });
        let (user_id, event) = rx.recv().await.unwrap();
        assert_eq!(user_id, 7);
        assert_eq!(event.name(), "meta_generated");
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::default();
        notifier.emit(7, GenerationEvent::ArcsGenerated { story_id: 3 });
    }
}
