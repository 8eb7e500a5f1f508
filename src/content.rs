//! Markdown document served to every session
//!
//! The document is read once at startup and shared read-only between
//! sessions.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Document compiled into the binary
pub const EMBEDDED_DOCUMENT: &str = include_str!("../content/bio.md");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Embedded,
    File(PathBuf),
}

impl ContentSource {
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) => ContentSource::File(path.to_path_buf()),
            None => ContentSource::Embedded,
        }
    }

    pub fn load(&self) -> io::Result<Arc<str>> {
        match self {
            ContentSource::Embedded => Ok(Arc::from(EMBEDDED_DOCUMENT)),
            ContentSource::File(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(Arc::from(text))
            }
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Embedded => write!(f, "embedded document"),
            ContentSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_document_is_present() {
        let text = ContentSource::Embedded.load().unwrap();
        assert!(text.starts_with('#'));
        assert!(text.contains('|'), "embedded bio should exercise tables");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("me.md");
        std::fs::write(&path, "# Me\n\nhello").unwrap();

        let source = ContentSource::from_path(Some(&path));
        assert_eq!(source, ContentSource::File(path.clone()));
        assert_eq!(&*source.load().unwrap(), "# Me\n\nhello");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = ContentSource::from_path(Some(Path::new("/definitely/not/here.md")));
        assert!(source.load().is_err());
        assert_eq!(ContentSource::from_path(None), ContentSource::Embedded);
    }
}
