//! Turns an accepted connection into a running session loop

use crate::app::event::{self, queue_key, EventSink};
use crate::app::model::{PtyInfo, SessionModel, SessionOptions};
use crate::app::session_loop::{restore_sequence, LoopExit, SessionLoop, SessionOutput};
use crate::app::ticker::{Ticker, DEFAULT_TICK_INTERVAL};
use crate::input::key_decoder::KeyDecoder;
use crate::input::keybindings::KeyBindings;
use crate::services::time_source::SharedTimeSource;
use crate::view::renderer::Renderer;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Sent to clients that connect without a PTY
pub const NO_TERMINAL_MESSAGE: &str = "no active terminal, skipping";

/// How long a trailing `ESC` waits for the rest of a sequence before it is
/// taken as the Escape key
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum HostError {
    /// The client did not request a pseudo-terminal
    NoTerminal,
    /// The terminal backend could not be created
    Output(io::Error),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::NoTerminal => write!(f, "{NO_TERMINAL_MESSAGE}"),
            HostError::Output(e) => write!(f, "failed to set up session output: {e}"),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HostError::NoTerminal => None,
            HostError::Output(e) => Some(e),
        }
    }
}

/// Everything needed to start sessions, built once and cloned per connection
#[derive(Clone)]
pub struct SessionHost {
    options: Arc<SessionOptions>,
    bindings: Arc<KeyBindings>,
    renderer: Arc<Renderer>,
    time_source: SharedTimeSource,
    tick_interval: Duration,
}

impl SessionHost {
    pub fn new(
        options: Arc<SessionOptions>,
        bindings: Arc<KeyBindings>,
        renderer: Arc<Renderer>,
        time_source: SharedTimeSource,
    ) -> Self {
        Self {
            options,
            bindings,
            renderer,
            time_source,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn time_source(&self) -> &SharedTimeSource {
        &self.time_source
    }

    /// Start a session on `output`.
    ///
    /// Without a PTY the client gets one diagnostic line and exit status 1,
    /// and no session state is created. A panic in the session closes the
    /// connection with status 1. Must be called inside a tokio runtime.
    pub async fn start<O>(
        &self,
        pty: Option<PtyInfo>,
        mut output: O,
    ) -> Result<SessionHandle, HostError>
    where
        O: SessionOutput + Clone + 'static,
    {
        let Some(pty) = pty else {
            tracing::info!("{NO_TERMINAL_MESSAGE}");
            if let Err(e) = output.write_error(NO_TERMINAL_MESSAGE).await {
                tracing::debug!(error = %e, "Failed to send diagnostic");
            }
            output.close(1).await;
            return Err(HostError::NoTerminal);
        };

        tracing::debug!(term = %pty.term, width = pty.width, height = pty.height, "Starting session");

        let model = SessionModel::new(
            &pty,
            self.time_source.wall_clock(),
            self.options.clone(),
            self.bindings.clone(),
            self.renderer.clone(),
        );
        let (width, height) = model.size();
        let session_loop = SessionLoop::new(model, output.clone()).map_err(HostError::Output)?;

        let (sink, source) = event::channel(width, height);
        let ticker = Ticker::spawn(sink.events(), self.tick_interval, self.time_source.clone());
        let session = tokio::spawn(session_loop.run(source, ticker));
        let task = tokio::spawn(supervise(session, output));

        Ok(SessionHandle {
            sink,
            decoder: Arc::new(Mutex::new(KeyDecoder::new())),
            task: Some(task),
        })
    }
}

/// Wait for the loop, closing the connection ourselves if it panicked
async fn supervise<O: SessionOutput>(session: JoinHandle<LoopExit>, mut output: O) -> LoopExit {
    match session.await {
        Ok(exit) => exit,
        Err(e) => {
            tracing::error!(error = %e, "Session loop crashed");
            if let Ok(bytes) = restore_sequence() {
                let _ = output.write(bytes).await;
            }
            output.close(1).await;
            LoopExit::Crashed
        }
    }
}

fn lock(decoder: &Mutex<KeyDecoder>) -> MutexGuard<'_, KeyDecoder> {
    decoder.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection-side handle to a running session.
///
/// Dropping it disconnects the session.
#[derive(Debug)]
pub struct SessionHandle {
    sink: EventSink,
    decoder: Arc<Mutex<KeyDecoder>>,
    task: Option<JoinHandle<LoopExit>>,
}

impl SessionHandle {
    /// Feed raw bytes from the client. Unrecognised sequences are dropped,
    /// and keys are dropped while the session is too far behind.
    pub fn send_input(&self, bytes: &[u8]) {
        let mut decoder = lock(&self.decoder);
        for key in decoder.feed(bytes) {
            if !self.sink.key(key) {
                return;
            }
        }
        if !decoder.has_pending() {
            return;
        }

        let generation = decoder.generation();
        let shared = self.decoder.clone();
        let events = self.sink.events();
        tokio::spawn(async move {
            tokio::time::sleep(ESCAPE_TIMEOUT).await;
            let mut decoder = lock(&shared);
            // Newer input already completed or replaced the sequence
            if decoder.generation() != generation {
                return;
            }
            for key in decoder.flush() {
                if !queue_key(&events, key) {
                    break;
                }
            }
        });
    }

    pub fn resize(&self, width: u16, height: u16) {
        self.sink.resize(width, height);
    }

    /// The client sent EOF. The session restores the client's screen and
    /// closes the connection.
    pub fn close_input(&self) {
        self.sink.close_input();
    }

    pub fn disconnect(&self) {
        self.sink.disconnect();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end
    pub async fn join(mut self) -> Option<LoopExit> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session_loop::testing::RecordingOutput;
    use crate::services::time_source::TestTimeSource;
    use crate::view::theme::Theme;
    use std::sync::atomic::Ordering;

    fn host() -> SessionHost {
        SessionHost::new(
            Arc::new(SessionOptions::new(Arc::from("# Bio\n\nHello there"))),
            Arc::new(KeyBindings::new()),
            Arc::new(Renderer::new(Theme::dark(), true)),
            TestTimeSource::shared(),
        )
    }

    fn pty() -> Option<PtyInfo> {
        Some(PtyInfo {
            term: "xterm-256color".to_string(),
            width: 100,
            height: 30,
        })
    }

    #[tokio::test]
    async fn test_no_terminal_sends_one_diagnostic() {
        let output = RecordingOutput::default();
        let recorded = output.recorded.clone();

        let result = host().start(None, output).await;

        assert!(matches!(result, Err(HostError::NoTerminal)));
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.errors, vec![NO_TERMINAL_MESSAGE.to_string()]);
        assert!(recorded.output.is_empty());
        assert_eq!(recorded.exit_status, Some(1));
    }

    #[tokio::test]
    async fn test_input_bytes_reach_the_loop() {
        let output = RecordingOutput::default();
        let recorded = output.recorded.clone();

        let handle = host().start(pty(), output).await.unwrap();
        handle.send_input(b"jjq");

        assert_eq!(handle.join().await, Some(LoopExit::Quit));
        assert_eq!(recorded.lock().unwrap().exit_status, Some(0));
    }

    #[tokio::test]
    async fn test_escape_quits() {
        let output = RecordingOutput::default();
        let handle = host().start(pty(), output).await.unwrap();

        handle.send_input(b"\x1b");

        assert_eq!(handle.join().await, Some(LoopExit::Quit));
    }

    #[tokio::test]
    async fn test_escape_sequence_split_across_chunks() {
        let output = RecordingOutput::default();
        let handle = host().start(pty(), output).await.unwrap();

        handle.send_input(b"\x1b");
        handle.send_input(b"[B");
        tokio::time::sleep(ESCAPE_TIMEOUT * 2).await;

        // A lone Escape would have quit
        assert!(!handle.is_finished());
        handle.disconnect();
        assert_eq!(handle.join().await, Some(LoopExit::Disconnected));
    }

    #[tokio::test]
    async fn test_close_input_ends_session_cleanly() {
        let output = RecordingOutput::default();
        let recorded = output.recorded.clone();
        let handle = host().start(pty(), output).await.unwrap();

        handle.close_input();

        assert_eq!(handle.join().await, Some(LoopExit::InputClosed));
        assert_eq!(recorded.lock().unwrap().exit_status, Some(0));
    }

    #[tokio::test]
    async fn test_crashed_loop_closes_with_failure() {
        let output = RecordingOutput::default();
        output.panic_on_write.store(true, Ordering::SeqCst);
        let recorded = output.recorded.clone();

        let handle = host().start(pty(), output).await.unwrap();

        assert_eq!(handle.join().await, Some(LoopExit::Crashed));
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.exit_status, Some(1));
        assert!(String::from_utf8_lossy(&recorded.output).ends_with("\x1b[?1049l"));
    }

    #[tokio::test]
    async fn test_huge_window_does_not_take_down_the_session() {
        let output = RecordingOutput::default();
        let recorded = output.recorded.clone();
        let huge = Some(PtyInfo {
            term: "xterm".to_string(),
            width: u16::MAX,
            height: u16::MAX,
        });

        let handle = host().start(huge, output).await.unwrap();
        handle.resize(u16::MAX, u16::MAX);
        handle.send_input(b"q");

        assert_eq!(handle.join().await, Some(LoopExit::Quit));
        assert_eq!(recorded.lock().unwrap().exit_status, Some(0));
    }

    #[tokio::test]
    async fn test_dropping_handle_disconnects() {
        let output = RecordingOutput::default();
        let recorded = output.recorded.clone();
        let handle = host().start(pty(), output).await.unwrap();

        handle.disconnect();
        assert_eq!(handle.join().await, Some(LoopExit::Disconnected));
        assert_eq!(recorded.lock().unwrap().exit_status, None);
    }
}
