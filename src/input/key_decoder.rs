//! Decoding of raw terminal input into key events
//!
//! An SSH session has no local tty for crossterm to read from: the channel
//! delivers whatever the client's terminal emits. This module turns those
//! bytes into `crossterm::event::KeyEvent`s so the rest of the session can
//! work with the same event vocabulary as a local terminal application.
//!
//! Sequences that are not understood are dropped silently.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ESC: u8 = 0x1b;

/// Longest unfinished sequence held back between chunks
const MAX_PENDING: usize = 32;

/// Stateful decoder for a stream of channel data.
///
/// A sequence cut off at the end of a chunk (`ESC`, `ESC [ 1 ;`, half a
/// UTF-8 character) is kept and completed by the next chunk. A lone `ESC`
/// is only an Escape key once nothing follows it, so callers [`flush`] the
/// decoder after a short pause.
///
/// [`flush`]: KeyDecoder::flush
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
    generation: u64,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        self.generation += 1;
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut keys = Vec::new();
        let mut pos = 0;
        while pos < input.len() {
            let rest = &input[pos..];
            if is_incomplete(rest) {
                self.pending = rest.to_vec();
                break;
            }
            let (key, consumed) = decode_one(rest);
            keys.extend(key);
            pos += consumed.max(1);
        }
        keys
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Bumped by every `feed` and `flush`
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decode whatever was held back as if no more input will follow
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        self.generation += 1;
        decode_keys(&std::mem::take(&mut self.pending))
    }
}

fn is_incomplete(bytes: &[u8]) -> bool {
    if bytes.len() > MAX_PENDING {
        return false;
    }
    match bytes {
        [ESC] | [ESC, b'O'] => true,
        [ESC, b'[', params @ ..] => params.iter().all(|b| (0x20..=0x3f).contains(b)),
        [ESC, rest @ ..] if rest[0] != ESC => is_partial_utf8(rest),
        _ => is_partial_utf8(bytes),
    }
}

fn is_partial_utf8(bytes: &[u8]) -> bool {
    let width = match bytes.first() {
        Some(0xc0..=0xdf) => 2,
        Some(0xe0..=0xef) => 3,
        Some(0xf0..=0xf7) => 4,
        _ => return false,
    };
    bytes.len() < width && bytes[1..].iter().all(|b| (0x80..=0xbf).contains(b))
}

/// Decode one complete chunk of input into key events. Truncated sequences
/// at the end are dropped, and a trailing `ESC` is an Escape key.
pub fn decode_keys(bytes: &[u8]) -> Vec<KeyEvent> {
    let mut keys = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let (key, consumed) = decode_one(&bytes[pos..]);
        if let Some(key) = key {
            keys.push(key);
        }
        pos += consumed.max(1);
    }

    keys
}

fn plain(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

/// Decode a single key from the front of `bytes`.
/// Returns the key (if any) and the number of bytes consumed.
fn decode_one(bytes: &[u8]) -> (Option<KeyEvent>, usize) {
    match bytes[0] {
        ESC => decode_escape(bytes),
        b'\r' | b'\n' => (Some(plain(KeyCode::Enter)), 1),
        b'\t' => (Some(plain(KeyCode::Tab)), 1),
        0x7f | 0x08 => (Some(plain(KeyCode::Backspace)), 1),
        0x00 => (Some(ctrl(' ')), 1),
        b @ 0x01..=0x1a => (Some(ctrl((b'a' + b - 1) as char)), 1),
        0x1c..=0x1f => (None, 1),
        _ => decode_utf8(bytes),
    }
}

fn decode_escape(bytes: &[u8]) -> (Option<KeyEvent>, usize) {
    match bytes.get(1) {
        None | Some(&ESC) => (Some(plain(KeyCode::Esc)), 1),
        Some(b'[') => decode_csi(bytes),
        Some(b'O') => decode_ss3(bytes),
        Some(_) => {
            // Alt+key arrives as ESC followed by the key itself
            let (inner, consumed) = decode_one(&bytes[1..]);
            let key = inner.map(|mut key| {
                key.modifiers |= KeyModifiers::ALT;
                key
            });
            (key, consumed + 1)
        }
    }
}

/// `ESC [ <params> <final>` sequences: cursor keys, navigation block, F5+.
fn decode_csi(bytes: &[u8]) -> (Option<KeyEvent>, usize) {
    let body = &bytes[2..];
    let Some(end) = body.iter().position(|b| (0x40..=0x7e).contains(b)) else {
        // Truncated sequence, drop the rest of the chunk
        return (None, bytes.len());
    };
    let consumed = 2 + end + 1;

    let params = std::str::from_utf8(&body[..end]).unwrap_or("");
    let mut fields = params.split(';');
    let number: Option<u16> = fields.next().and_then(|f| f.parse().ok());
    let modifiers = fields
        .next()
        .and_then(|f| f.parse::<u8>().ok())
        .map(modifiers_from_param)
        .unwrap_or(KeyModifiers::NONE);

    let code = match body[end] {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        b'Z' => {
            return (
                Some(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT)),
                consumed,
            )
        }
        b'~' => match number {
            Some(1) | Some(7) => Some(KeyCode::Home),
            Some(2) => Some(KeyCode::Insert),
            Some(3) => Some(KeyCode::Delete),
            Some(4) | Some(8) => Some(KeyCode::End),
            Some(5) => Some(KeyCode::PageUp),
            Some(6) => Some(KeyCode::PageDown),
            Some(n @ 11..=15) => Some(KeyCode::F((n - 10) as u8)),
            Some(n @ 17..=21) => Some(KeyCode::F((n - 11) as u8)),
            Some(n @ 23..=24) => Some(KeyCode::F((n - 12) as u8)),
            _ => None,
        },
        _ => None,
    };

    (code.map(|code| KeyEvent::new(code, modifiers)), consumed)
}

/// `ESC O <final>` sequences sent in application cursor mode.
fn decode_ss3(bytes: &[u8]) -> (Option<KeyEvent>, usize) {
    let Some(&final_byte) = bytes.get(2) else {
        return (None, bytes.len());
    };

    let code = match final_byte {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        b'P'..=b'S' => Some(KeyCode::F(final_byte - b'P' + 1)),
        _ => None,
    };

    (code.map(plain), 3)
}

/// xterm modifier parameter: 1 + (shift | alt << 1 | ctrl << 2)
fn modifiers_from_param(param: u8) -> KeyModifiers {
    let bits = param.saturating_sub(1);
    let mut modifiers = KeyModifiers::NONE;
    if bits & 1 != 0 {
        modifiers |= KeyModifiers::SHIFT;
    }
    if bits & 2 != 0 {
        modifiers |= KeyModifiers::ALT;
    }
    if bits & 4 != 0 {
        modifiers |= KeyModifiers::CONTROL;
    }
    modifiers
}

fn decode_utf8(bytes: &[u8]) -> (Option<KeyEvent>, usize) {
    let width = match bytes[0] {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return (None, 1),
    };
    if bytes.len() < width {
        return (None, bytes.len());
    }

    match std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next())
    {
        Some(c) => (Some(plain(KeyCode::Char(c))), width),
        None => (None, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(bytes: &[u8]) -> Vec<(KeyCode, KeyModifiers)> {
        decode_keys(bytes)
            .into_iter()
            .map(|k| (k.code, k.modifiers))
            .collect()
    }

    #[test]
    fn test_printable_characters() {
        assert_eq!(
            codes(b"qG?"),
            vec![
                (KeyCode::Char('q'), KeyModifiers::NONE),
                (KeyCode::Char('G'), KeyModifiers::NONE),
                (KeyCode::Char('?'), KeyModifiers::NONE),
            ]
        );
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(
            codes(&[0x03]),
            vec![(KeyCode::Char('c'), KeyModifiers::CONTROL)]
        );
        assert_eq!(
            codes(&[0x15, 0x04]),
            vec![
                (KeyCode::Char('u'), KeyModifiers::CONTROL),
                (KeyCode::Char('d'), KeyModifiers::CONTROL),
            ]
        );
        assert_eq!(codes(b"\r"), vec![(KeyCode::Enter, KeyModifiers::NONE)]);
        assert_eq!(codes(b"\t"), vec![(KeyCode::Tab, KeyModifiers::NONE)]);
        assert_eq!(codes(&[0x7f]), vec![(KeyCode::Backspace, KeyModifiers::NONE)]);
    }

    fn fed(decoder: &mut KeyDecoder, bytes: &[u8]) -> Vec<(KeyCode, KeyModifiers)> {
        decoder
            .feed(bytes)
            .into_iter()
            .map(|k| (k.code, k.modifiers))
            .collect()
    }

    #[test]
    fn test_sequence_split_across_chunks() {
        let mut decoder = KeyDecoder::new();

        assert!(fed(&mut decoder, &[ESC]).is_empty());
        assert!(decoder.has_pending());
        assert_eq!(
            fed(&mut decoder, b"[A"),
            vec![(KeyCode::Up, KeyModifiers::NONE)]
        );
        assert!(!decoder.has_pending());

        assert_eq!(
            fed(&mut decoder, b"j\x1b[1;"),
            vec![(KeyCode::Char('j'), KeyModifiers::NONE)]
        );
        assert_eq!(
            fed(&mut decoder, b"5B"),
            vec![(KeyCode::Down, KeyModifiers::CONTROL)]
        );
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut decoder = KeyDecoder::new();
        let bytes = "é".as_bytes();

        assert!(fed(&mut decoder, &bytes[..1]).is_empty());
        assert_eq!(
            fed(&mut decoder, &bytes[1..]),
            vec![(KeyCode::Char('é'), KeyModifiers::NONE)]
        );
    }

    #[test]
    fn test_flush_turns_lone_escape_into_esc() {
        let mut decoder = KeyDecoder::new();
        fed(&mut decoder, &[ESC]);
        let generation = decoder.generation();

        let keys: Vec<_> = decoder.flush().into_iter().map(|k| k.code).collect();

        assert_eq!(keys, vec![KeyCode::Esc]);
        assert!(!decoder.has_pending());
        assert!(decoder.generation() > generation);
        assert!(decoder.flush().is_empty());
    }

    #[test]
    fn test_runaway_sequence_is_not_held() {
        let mut decoder = KeyDecoder::new();
        let mut bytes = b"\x1b[".to_vec();
        bytes.extend(std::iter::repeat(b'1').take(MAX_PENDING * 2));

        assert!(fed(&mut decoder, &bytes).is_empty());
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_lone_escape() {
        assert_eq!(codes(&[ESC]), vec![(KeyCode::Esc, KeyModifiers::NONE)]);
        assert_eq!(
            codes(&[ESC, ESC]),
            vec![
                (KeyCode::Esc, KeyModifiers::NONE),
                (KeyCode::Esc, KeyModifiers::NONE)
            ]
        );
    }

    #[test]
    fn test_cursor_keys() {
        assert_eq!(
            codes(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![
                (KeyCode::Up, KeyModifiers::NONE),
                (KeyCode::Down, KeyModifiers::NONE),
                (KeyCode::Right, KeyModifiers::NONE),
                (KeyCode::Left, KeyModifiers::NONE),
            ]
        );
        // Application cursor mode
        assert_eq!(
            codes(b"\x1bOA\x1bOB"),
            vec![
                (KeyCode::Up, KeyModifiers::NONE),
                (KeyCode::Down, KeyModifiers::NONE),
            ]
        );
    }

    #[test]
    fn test_navigation_block() {
        assert_eq!(
            codes(b"\x1b[5~\x1b[6~\x1b[1~\x1b[4~\x1b[H\x1b[F"),
            vec![
                (KeyCode::PageUp, KeyModifiers::NONE),
                (KeyCode::PageDown, KeyModifiers::NONE),
                (KeyCode::Home, KeyModifiers::NONE),
                (KeyCode::End, KeyModifiers::NONE),
                (KeyCode::Home, KeyModifiers::NONE),
                (KeyCode::End, KeyModifiers::NONE),
            ]
        );
    }

    #[test]
    fn test_modified_cursor_key() {
        assert_eq!(
            codes(b"\x1b[1;5A"),
            vec![(KeyCode::Up, KeyModifiers::CONTROL)]
        );
        assert_eq!(
            codes(b"\x1b[1;2B"),
            vec![(KeyCode::Down, KeyModifiers::SHIFT)]
        );
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(
            codes(b"\x1bOP\x1b[15~\x1b[24~"),
            vec![
                (KeyCode::F(1), KeyModifiers::NONE),
                (KeyCode::F(5), KeyModifiers::NONE),
                (KeyCode::F(12), KeyModifiers::NONE),
            ]
        );
    }

    #[test]
    fn test_alt_prefix() {
        assert_eq!(
            codes(b"\x1bq"),
            vec![(KeyCode::Char('q'), KeyModifiers::ALT)]
        );
    }

    #[test]
    fn test_multibyte_utf8() {
        assert_eq!(
            codes("é↑".as_bytes()),
            vec![
                (KeyCode::Char('é'), KeyModifiers::NONE),
                (KeyCode::Char('↑'), KeyModifiers::NONE),
            ]
        );
    }

    #[test]
    fn test_garbage_is_dropped() {
        // Unknown CSI final byte, stray continuation byte, truncated UTF-8
        assert!(codes(b"\x1b[99x").is_empty());
        assert!(codes(&[0x80]).is_empty());
        assert!(codes(&[0xe2, 0x86]).is_empty());
        // Valid keys around garbage survive
        assert_eq!(
            codes(b"j\x1b[99xk"),
            vec![
                (KeyCode::Char('j'), KeyModifiers::NONE),
                (KeyCode::Char('k'), KeyModifiers::NONE),
            ]
        );
    }

    #[test]
    fn test_truncated_csi() {
        assert!(codes(b"\x1b[1;").is_empty());
    }
}
