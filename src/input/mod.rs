//! Input handling
//!
//! Raw bytes arriving on an SSH channel are decoded into crossterm key
//! events, which are then resolved against the key binding set.

pub mod key_decoder;
pub mod keybindings;
