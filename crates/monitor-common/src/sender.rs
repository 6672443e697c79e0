//! The [`EventSender`] trait decouples event-producing handlers from the
//! transport delivering records to the collector.
//!
//! [`EventSender::send`] must not block: handlers run inline on the event
//! path and are never allowed to wait.

use tokio::sync::mpsc;

pub trait EventSender<T>: Clone + Send + 'static {
    /// Must not block since handlers run on the hot path.
    fn send(&self, event: T);
}

/// Implementation for tokio::mpsc bounded channels.
/// Sending with a full channel will drop the record: delivery to the
/// collector is lossy under load.
impl<T: Send + 'static> EventSender<T> for mpsc::Sender<T> {
    fn send(&self, event: T) {
        if self.try_send(event).is_err() {
            log::warn!("dropping event");
        }
    }
}

impl<T: Send + 'static> EventSender<T> for mpsc::UnboundedSender<T> {
    fn send(&self, event: T) {
        let _ = mpsc::UnboundedSender::send(self, event);
    }
}

/// EventSenderWrapper wraps an EventSender with a new one which calls
/// a callback on every record sent. This is useful for components which
/// want to take some action when emitting events.
#[derive(Clone)]
pub struct EventSenderWrapper<S, F> {
    cb: F,
    inner: S,
}

impl<S, F> EventSenderWrapper<S, F> {
    pub fn new(inner: S, cb: F) -> Self {
        Self { inner, cb }
    }
}

impl<S, F, T> EventSender<T> for EventSenderWrapper<S, F>
where
    S: EventSender<T>,
    F: Fn(&T) + Clone + Send + 'static,
{
    fn send(&self, event: T) {
        (self.cb)(&event);
        self.inner.send(event)
    }
}
