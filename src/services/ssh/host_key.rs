//! Persistent server host key

use russh_keys::key::KeyPair;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum HostKeyError {
    /// The key file exists but could not be read or parsed
    Load {
        path: PathBuf,
        source: russh_keys::Error,
    },
    /// Key generation failed
    Generate,
    /// The generated key could not be written
    Write { path: PathBuf, source: io::Error },
    /// The generated key could not be encoded
    Encode {
        path: PathBuf,
        source: russh_keys::Error,
    },
}

impl std::fmt::Display for HostKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostKeyError::Load { path, source } => {
                write!(f, "failed to load host key {}: {}", path.display(), source)
            }
            HostKeyError::Generate => write!(f, "failed to generate ed25519 host key"),
            HostKeyError::Write { path, source } => {
                write!(f, "failed to write host key {}: {}", path.display(), source)
            }
            HostKeyError::Encode { path, source } => {
                write!(f, "failed to encode host key {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for HostKeyError {}

/// Load the host key at `path`, generating and saving an ed25519 key if the
/// file does not exist yet.
pub fn load_or_generate(path: &Path) -> Result<KeyPair, HostKeyError> {
    if path.exists() {
        let key = russh_keys::load_secret_key(path, None).map_err(|source| HostKeyError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded host key");
        return Ok(key);
    }

    let key = KeyPair::generate_ed25519().ok_or(HostKeyError::Generate)?;
    save(&key, path)?;
    tracing::info!(path = %path.display(), "Generated new host key");
    Ok(key)
}

fn save(key: &KeyPair, path: &Path) -> Result<(), HostKeyError> {
    let write_error = |source| HostKeyError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }

    let file = File::create(path).map_err(write_error)?;
    restrict_permissions(&file).map_err(write_error)?;

    russh_keys::encode_pkcs8_pem(key, file).map_err(|source| HostKeyError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) -> io::Result<()> {
    Ok(())
}
