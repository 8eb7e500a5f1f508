pub mod tracing;

use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use termfolio::app::{PtyInfo, SessionHost, SessionOptions, SessionOutput};
use termfolio::input::keybindings::KeyBindings;
use termfolio::services::time_source::TestTimeSource;
use termfolio::view::renderer::Renderer;
use termfolio::view::theme::Theme;
use tokio::sync::mpsc;

pub const BIO: &str = "# Ada Example

## About

Systems programmer who likes terminals.

- Rust
- Networking

## Contact

Write to ada@example.com
";

#[derive(Debug, Default)]
pub struct Recorded {
    pub errors: Vec<String>,
    pub exit_status: Option<u32>,
}

/// Session output that forwards every write as one frame
#[derive(Clone)]
pub struct ChannelRecorder {
    frames: mpsc::UnboundedSender<Vec<u8>>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl ChannelRecorder {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>, Arc<Mutex<Recorded>>) {
        let (frames, receiver) = mpsc::unbounded_channel();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        (
            Self {
                frames,
                recorded: recorded.clone(),
            },
            receiver,
            recorded,
        )
    }
}

#[async_trait]
impl SessionOutput for ChannelRecorder {
    async fn write(&mut self, bytes: Vec<u8>) -> io::Result<()> {
        self.frames
            .send(bytes)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "test receiver gone"))
    }

    async fn write_error(&mut self, message: &str) -> io::Result<()> {
        self.recorded.lock().unwrap().errors.push(message.to_string());
        Ok(())
    }

    async fn close(&mut self, exit_status: u32) {
        self.recorded.lock().unwrap().exit_status = Some(exit_status);
    }
}

pub fn host() -> SessionHost {
    SessionHost::new(
        Arc::new(SessionOptions::new(Arc::from(BIO))),
        Arc::new(KeyBindings::new()),
        Arc::new(Renderer::new(Theme::dark(), true)),
        TestTimeSource::shared(),
    )
}

pub fn pty(width: u16, height: u16) -> Option<PtyInfo> {
    Some(PtyInfo {
        term: "xterm-256color".to_string(),
        width,
        height,
    })
}

pub async fn next_frame(frames: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Vec<u8> {
    tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("session output closed")
}

/// Screen text after replaying `bytes` on an empty terminal of the given size
pub fn screen_text(width: u16, height: u16, bytes: &[u8]) -> String {
    let mut parser = vt100::Parser::new(height, width, 0);
    parser.process(bytes);
    parser.screen().contents()
}
