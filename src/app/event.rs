//! Events consumed by a session loop, and the channel that carries them

use chrono::{DateTime, Local};
use crossterm::event::KeyEvent;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Notify};

/// Keys and ticks waiting for a busy session. Keys beyond this are dropped.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Everything that can happen to a running session.
///
/// Queued events for one session are handled in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Clock update from the ticker
    Tick(DateTime<Local>),
    /// The client's window changed size
    Resize { width: u16, height: u16 },
    /// A decoded key press
    Key(KeyEvent),
    /// The connection went away
    Disconnect,
}

/// Create the event channel for one session.
///
/// Keys and ticks share a bounded queue. Window sizes are kept as a single
/// latest value, and disconnect and end-of-input are signals, so none of
/// them can be lost when the queue is full.
pub fn channel(width: u16, height: u16) -> (EventSink, EventSource) {
    let (events, receiver) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (size, size_receiver) = watch::channel((width, height));
    let disconnected = Arc::new(Notify::new());
    let input_closed = Arc::new(Notify::new());

    let sink = EventSink {
        events,
        size,
        disconnected: disconnected.clone(),
        input_closed: input_closed.clone(),
    };
    let source = EventSource {
        events: receiver,
        size: size_receiver,
        disconnected,
        input_closed,
    };
    (sink, source)
}

/// Queue a key without waiting. Returns false once the session is gone.
pub fn queue_key(events: &mpsc::Sender<SessionEvent>, key: KeyEvent) -> bool {
    match events.try_send(SessionEvent::Key(key)) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::trace!("Session input queue full, dropping key");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Producer side, held by the connection
#[derive(Debug, Clone)]
pub struct EventSink {
    events: mpsc::Sender<SessionEvent>,
    size: watch::Sender<(u16, u16)>,
    disconnected: Arc<Notify>,
    input_closed: Arc<Notify>,
}

impl EventSink {
    /// Sender for keys and ticks
    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events.clone()
    }

    pub fn key(&self, key: KeyEvent) -> bool {
        queue_key(&self.events, key)
    }

    pub fn resize(&self, width: u16, height: u16) {
        let _ = self.size.send((width, height));
    }

    /// The client will send no more input
    pub fn close_input(&self) {
        self.input_closed.notify_one();
    }

    pub fn disconnect(&self) {
        self.disconnected.notify_one();
    }
}

/// Consumer side, owned by the session loop
#[derive(Debug)]
pub struct EventSource {
    events: mpsc::Receiver<SessionEvent>,
    size: watch::Receiver<(u16, u16)>,
    disconnected: Arc<Notify>,
    input_closed: Arc<Notify>,
}

impl EventSource {
    /// Next event for the session, or `None` once the client has closed its
    /// input and everything queued before that has been delivered.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        tokio::select! {
            biased;
            Some(event) = self.events.recv() => Some(event),
            Ok(()) = self.size.changed() => {
                let (width, height) = *self.size.borrow_and_update();
                Some(SessionEvent::Resize { width, height })
            }
            _ = self.disconnected.notified() => Some(SessionEvent::Disconnect),
            _ = self.input_closed.notified() => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_queued_keys_come_before_signals() {
        let (sink, mut source) = channel(80, 24);

        sink.key(key('j'));
        sink.close_input();

        assert_eq!(source.next().await, Some(SessionEvent::Key(key('j'))));
        assert_eq!(source.next().await, None);
    }

    #[tokio::test]
    async fn test_resizes_collapse_to_latest() {
        let (sink, mut source) = channel(80, 24);

        sink.resize(100, 30);
        sink.resize(120, 40);

        assert_eq!(
            source.next().await,
            Some(SessionEvent::Resize { width: 120, height: 40 })
        );
    }

    #[tokio::test]
    async fn test_full_queue_drops_keys_but_not_disconnect() {
        let (sink, mut source) = channel(80, 24);

        for _ in 0..EVENT_QUEUE_CAPACITY * 4 {
            assert!(sink.key(key('j')));
        }
        sink.disconnect();

        let mut keys = 0;
        loop {
            match source.next().await {
                Some(SessionEvent::Key(_)) => keys += 1,
                Some(SessionEvent::Disconnect) => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(keys, EVENT_QUEUE_CAPACITY);
    }

    #[tokio::test]
    async fn test_key_reports_closed_session() {
        let (sink, source) = channel(80, 24);
        drop(source);

        assert!(!sink.key(key('q')));
    }
}
