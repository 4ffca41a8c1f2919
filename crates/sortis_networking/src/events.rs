//! # Observer Channel
//!
//! Synchronizers publish what happened; the UI (or a test) drains it.
//! Receivers compete: each event reaches exactly one of them, so a second
//! observer takes events away from the first instead of seeing a copy.

use crossbeam_channel::{unbounded, Receiver, Sender, TryIter};

/// Unbounded event stream from a synchronizer to its observers.
#[derive(Debug)]
pub struct EventChannel<E> {
    tx: Sender<E>,
    rx: Receiver<E>,
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventChannel<E> {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Publishes an event. Never blocks.
    pub fn emit(&self, event: E) {
        // The channel owns a receiver, so the send cannot fail.
        let _ = self.tx.send(event);
    }

    /// A receiver that competes with [`drain`](Self::drain) for events.
    ///
    /// Hand it to a single consumer that replaces draining the channel, not
    /// to an extra observer.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<E> {
        self.rx.clone()
    }

    /// Takes every pending event.
    pub fn drain(&self) -> Vec<E> {
        self.rx.try_iter().collect()
    }

    /// Iterates pending events without blocking.
    pub fn try_iter(&self) -> TryIter<'_, E> {
        self.rx.try_iter()
    }

    /// Pending event count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_drain() {
        let events = EventChannel::new();
        events.emit(1);
        events.emit(2);
        assert_eq!(events.len(), 2);
        assert_eq!(events.drain(), vec![1, 2]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_receivers_split_the_stream() {
        let events = EventChannel::new();
        let observer = events.subscribe();
        events.emit("turn");
        events.emit("dice");
        assert_eq!(observer.try_recv().ok(), Some("turn"));
        assert_eq!(events.drain(), vec!["dice"]);
        assert!(observer.try_recv().is_err());
    }
}
