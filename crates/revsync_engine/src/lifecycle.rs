//! Platform lifecycle signal contract.
//!
//! The host forwards application lifecycle notifications over a channel;
//! the session subscribes once at initialization and uses the transitions
//! for opportunistic work (flushes, pending token saves).

use tokio::sync::mpsc;

/// An application lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The application process was created.
    Created,
    /// The application moved to the foreground.
    Foregrounded,
    /// The application moved to the background.
    Backgrounded,
}

/// Receiving half of a lifecycle-event channel.
pub type LifecycleReceiver = mpsc::Receiver<LifecycleEvent>;

/// Creates a bounded lifecycle-event channel.
pub fn lifecycle_channel(capacity: usize) -> (mpsc::Sender<LifecycleEvent>, LifecycleReceiver) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_delivers_events_in_order() {
        let (tx, mut rx) = lifecycle_channel(4);
        tx.send(LifecycleEvent::Created).await.unwrap();
        tx.send(LifecycleEvent::Foregrounded).await.unwrap();

        assert_eq!(rx.recv().await, Some(LifecycleEvent::Created));
        assert_eq!(rx.recv().await, Some(LifecycleEvent::Foregrounded));
    }
}
