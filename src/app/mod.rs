//! Per-connection terminal session: state, event loop, ticker and host

pub mod event;
pub mod host;
pub mod model;
pub mod session_loop;
pub mod ticker;

pub use event::SessionEvent;
pub use host::{HostError, SessionHandle, SessionHost};
pub use model::{PtyInfo, SessionModel, SessionOptions};
pub use session_loop::{LoopExit, SessionOutput};
