use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::warn;

type Envelope = Arc<dyn Any + Send + Sync>;

/// In-process typed publish/subscribe bus. A publish that can't be
/// delivered because a subscriber's channel is full is dropped and logged,
/// never blocked on — mirrors `kernel/bus/event.go`'s non-blocking
/// `select { ... default: }` sends.
pub struct EventBus {
    intake_tx: mpsc::Sender<Envelope>,
    subs: Arc<RwLock<HashMap<TypeId, Vec<mpsc::Sender<Envelope>>>>>,
    closed: Arc<RwLock<bool>>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (intake_tx, mut intake_rx) = mpsc::channel::<Envelope>(buffer_size);
        let subs: Arc<RwLock<HashMap<TypeId, Vec<mpsc::Sender<Envelope>>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let closed = Arc::new(RwLock::new(false));

        let run_subs = subs.clone();
        tokio::spawn(async move {
            while let Some(event) = intake_rx.recv().await {
                let type_id = (*event).type_id();
                let subs = run_subs.read().await;
                if let Some(channels) = subs.get(&type_id) {
                    for ch in channels {
                        if ch.try_send(event.clone()).is_err() {
                            warn!("event bus subscriber channel full, dropping event");
                        }
                    }
                }
            }
        });

        Self { intake_tx, subs, closed }
    }

    /// Non-blocking publish. Silently drops (with a warning) if the
    /// intake channel is full or the bus has been closed.
    pub async fn publish<T: Any + Send + Sync>(&self, event: T) {
        if *self.closed.read().await {
            warn!("event bus publish after close, dropping event");
            return;
        }
        let envelope: Envelope = Arc::new(event);
        if self.intake_tx.try_send(envelope).is_err() {
            warn!("event bus intake full, dropping event");
        }
    }

    /// Subscribe to every event of exact type `T`, returning a receiver
    /// buffered to `capacity`. Callers downcast each received `Arc<dyn
    /// Any>` back to `T` with `downcast::<T>()`.
    pub async fn subscribe<T: Any + Send + Sync>(&self, capacity: usize) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(capacity);
        let mut subs = self.subs.write().await;
        subs.entry(TypeId::of::<T>()).or_default().push(tx);
        rx
    }

    pub async fn close(&self) {
        let mut closed = self.closed.write().await;
        if *closed {
            return;
        }
        *closed = true;
        self.subs.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[tokio::test]
    async fn delivers_to_matching_subscriber_only() {
        let bus = EventBus::new(16);
        let mut ping_rx = bus.subscribe::<Ping>(8).await;
        let mut other_rx = bus.subscribe::<String>(8).await;

        bus.publish(Ping(7)).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let got = ping_rx.try_recv().expect("ping delivered");
        assert_eq!(*got.downcast::<Ping>().unwrap(), Ping(7));
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_stops_further_publishes() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe::<Ping>(4).await;
        bus.close().await;
        bus.publish(Ping(1)).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
