//! Session event loop
//!
//! Owns a [`SessionModel`] and processes its events one at a time. Frames are
//! drawn through a ratatui terminal whose backend writes into a
//! [`FrameBuffer`]; after every draw the buffered bytes go to the connection.

use crate::app::event::{EventSource, SessionEvent};
use crate::app::model::{SessionModel, Update};
use crate::app::ticker::Ticker;
use async_trait::async_trait;
use crossterm::cursor::{Hide, Show};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};
use std::io;
use std::sync::{Arc, Mutex};

/// Outbound side of a connection
#[async_trait]
pub trait SessionOutput: Send {
    /// Terminal output (frames and mode switches)
    async fn write(&mut self, bytes: Vec<u8>) -> io::Result<()>;

    /// Diagnostic line on the error stream
    async fn write_error(&mut self, message: &str) -> io::Result<()>;

    /// Report the exit status and close the connection
    async fn close(&mut self, exit_status: u32);
}

/// In-memory sink for the terminal backend
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer(Arc<Mutex<Vec<u8>>>);

impl FrameBuffer {
    /// Drain everything written since the last call
    pub fn take(&self) -> Vec<u8> {
        let mut bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *bytes)
    }
}

impl io::Write for FrameBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The user pressed a quit key; the connection was closed
    Quit,
    /// The client went away first
    Disconnected,
    /// The client closed its input; the connection was closed
    InputClosed,
    /// Writing to the connection failed
    OutputClosed,
    /// The loop panicked; the connection was closed with status 1
    Crashed,
}

/// Bytes that give the client its own screen and cursor back
pub fn restore_sequence() -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    queue!(bytes, Show, LeaveAlternateScreen)?;
    Ok(bytes)
}

pub struct SessionLoop<O: SessionOutput> {
    model: SessionModel,
    output: O,
    terminal: Terminal<CrosstermBackend<FrameBuffer>>,
    buffer: FrameBuffer,
}

impl<O: SessionOutput> SessionLoop<O> {
    pub fn new(model: SessionModel, output: O) -> io::Result<Self> {
        let buffer = FrameBuffer::default();
        let (width, height) = model.size();
        let terminal = Terminal::with_options(
            CrosstermBackend::new(buffer.clone()),
            TerminalOptions {
                viewport: Viewport::Fixed(Rect::new(0, 0, width, height)),
            },
        )?;

        Ok(Self {
            model,
            output,
            terminal,
            buffer,
        })
    }

    /// Process events until quit, end of input, disconnect or a failed
    /// write.
    ///
    /// The ticker is stopped before this returns.
    pub async fn run(mut self, mut events: EventSource, ticker: Ticker) -> LoopExit {
        let exit = self.process(&mut events).await;
        drop(ticker);

        if matches!(exit, LoopExit::Quit | LoopExit::InputClosed) {
            if let Err(e) = self.leave().await {
                tracing::debug!(error = %e, "Failed to restore client terminal");
            }
            self.output.close(0).await;
        }

        tracing::debug!(?exit, "Session loop finished");
        exit
    }

    async fn process(&mut self, events: &mut EventSource) -> LoopExit {
        if let Err(e) = self.enter().await {
            tracing::debug!(error = %e, "Failed to write first frame");
            return LoopExit::OutputClosed;
        }

        while let Some(event) = events.next().await {
            tracing::trace!(?event, "Session event");

            let resized = matches!(event, SessionEvent::Resize { .. });

            match self.model.update(event) {
                Update::Unchanged => {}
                Update::Redraw => {
                    if resized {
                        // The model clamps what the client asked for
                        let (width, height) = self.model.size();
                        if let Err(e) = self.terminal.resize(Rect::new(0, 0, width, height)) {
                            tracing::warn!(error = %e, "Failed to resize terminal");
                        }
                    }
                    if let Err(e) = self.draw().await {
                        tracing::debug!(error = %e, "Failed to write frame");
                        return LoopExit::OutputClosed;
                    }
                }
                Update::Quit => return LoopExit::Quit,
                Update::Disconnected => return LoopExit::Disconnected,
            }
        }

        tracing::debug!("Client closed its input");
        LoopExit::InputClosed
    }

    async fn enter(&mut self) -> io::Result<()> {
        let mut writer = self.buffer.clone();
        queue!(writer, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        self.draw().await
    }

    async fn leave(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.output.write(restore_sequence()?).await
    }

    async fn draw(&mut self) -> io::Result<()> {
        let model = &self.model;
        self.terminal.draw(|frame| model.view(frame))?;
        self.flush().await
    }

    async fn flush(&mut self) -> io::Result<()> {
        let bytes = self.buffer.take();
        if bytes.is_empty() {
            return Ok(());
        }
        self.output.write(bytes).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    pub struct Recorded {
        pub output: Vec<u8>,
        pub errors: Vec<String>,
        pub exit_status: Option<u32>,
        pub writes: usize,
    }

    /// Output that records everything, optionally failing writes or
    /// panicking on the next one
    #[derive(Debug, Clone, Default)]
    pub struct RecordingOutput {
        pub recorded: Arc<Mutex<Recorded>>,
        pub fail_writes: bool,
        pub panic_on_write: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SessionOutput for RecordingOutput {
        async fn write(&mut self, bytes: Vec<u8>) -> io::Result<()> {
            if self.panic_on_write.swap(false, Ordering::SeqCst) {
                panic!("output exploded");
            }
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            let mut recorded = self.recorded.lock().unwrap();
            recorded.output.extend(bytes);
            recorded.writes += 1;
            Ok(())
        }

        async fn write_error(&mut self, message: &str) -> io::Result<()> {
            self.recorded.lock().unwrap().errors.push(message.to_string());
            Ok(())
        }

        async fn close(&mut self, exit_status: u32) {
            self.recorded.lock().unwrap().exit_status = Some(exit_status);
        }
    }
}
