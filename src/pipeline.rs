//! Frame handoff between capture and recognition
//!
//! A single-slot, latest-wins channel: the producer never blocks and a
//! stale undelivered frame is dropped rather than queued, because
//! recognizing an outdated crop is worse than skipping one. This is the
//! recommended integration between a capture thread and a recognition
//! worker; the crate owns no other threading.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Create a connected publisher/consumer pair over a single-slot queue.
pub fn frame_slot<T>() -> (FramePublisher<T>, FrameConsumer<T>) {
    let (tx, rx) = bounded(1);
    (
        FramePublisher {
            tx,
            rx: rx.clone(),
        },
        FrameConsumer { rx },
    )
}

/// Capture-side handle.
pub struct FramePublisher<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> FramePublisher<T> {
    /// Publish the latest frame without blocking. A frame still sitting in
    /// the slot is stale and gets dropped first; returns `true` when that
    /// happened.
    pub fn publish(&self, frame: T) -> bool {
        let mut frame = frame;
        let mut dropped = false;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(returned)) => {
                    if self.rx.try_recv().is_ok() {
                        dropped = true;
                    }
                    frame = returned;
                }
                Err(TrySendError::Disconnected(_)) => return dropped,
            }
        }
    }
}

/// Worker-side handle.
pub struct FrameConsumer<T> {
    rx: Receiver<T>,
}

impl<T> FrameConsumer<T> {
    /// Take the pending frame, if any, without blocking.
    pub fn take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next frame.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_a_published_frame() {
        let (publisher, consumer) = frame_slot();
        assert!(!publisher.publish(1u32));
        assert_eq!(consumer.take(), Some(1));
        assert_eq!(consumer.take(), None);
    }

    #[test]
    fn stale_frames_are_dropped_for_newer_ones() {
        let (publisher, consumer) = frame_slot();
        assert!(!publisher.publish("old"));
        assert!(publisher.publish("new"));
        assert_eq!(consumer.take(), Some("new"));
        assert_eq!(consumer.take(), None);
    }

    #[test]
    fn publish_after_consumer_drop_does_not_block() {
        let (publisher, consumer) = frame_slot();
        drop(consumer);
        publisher.publish(1u32);
        publisher.publish(2u32);
    }

    #[test]
    fn take_timeout_sees_cross_thread_frames() {
        let (publisher, consumer) = frame_slot();
        let handle = std::thread::spawn(move || {
            publisher.publish(42u32);
        });
        let frame = consumer.take_timeout(Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(frame, Some(42));
    }
}
