//! In-process fan-out of flow transitions.

use faceauth_types::events::FlowEvent;
use futures::{stream::BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Broadcast channel carrying every [`FlowEvent`]. Slow subscribers lose the
/// oldest events rather than blocking a flow.
#[derive(Clone)]
pub struct StatusFeed {
    tx: broadcast::Sender<FlowEvent>,
}

impl StatusFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: FlowEvent) {
        let _ = self.tx.send(event);
    }

    pub fn receiver(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    pub fn subscribe(&self) -> BoxStream<'static, FlowEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new(64)
    }
}
