//! View and UI layer
//!
//! Markdown rendering, the scrollable viewport and the help footer.

pub mod help;
pub mod markdown;
pub mod renderer;
pub mod theme;
pub mod viewport;
