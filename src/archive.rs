//! archive
//!
//! Extraction of gzip-compressed tar archives into a working directory.
//!
//! # Behaviour
//!
//! Entries are read sequentially. Directories are created (parents included)
//! and regular files are created or truncated, both with the entry's mode
//! bits. Every other entry type (symlinks, hard links, devices, pax headers)
//! is skipped. Module trees consist of plain files.
//!
//! Corruption is detected lazily while reading entries, so an invalid
//! archive may leave partial output behind. Callers discard the target
//! directory on error.
//!
//! Entry paths that are absolute or contain `..` are rejected.
//!
//! Directories always keep owner `rwx` on top of their recorded mode, so
//! later entries can be written into them and the tree can be removed.
//!
//! [`extract_tar_gz_until`] checks a stop condition before every entry, for
//! callers that run extraction on a blocking thread they cannot abort.
//!
//! # Example
//!
//! ```no_run
//! use modsync::archive::extract_tar_gz;
//! use std::fs::File;
//! use std::path::Path;
//!
//! let archive = File::open("module.tar.gz").unwrap();
//! let root = extract_tar_gz(archive, Path::new("/tmp/scratch")).unwrap();
//! println!("module root: /tmp/scratch/{}", root);
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::debug;

use crate::sync::ErrorKind;

/// Errors from archive extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input is not valid gzip or not a valid tar stream.
    #[error("invalid archive: {0}")]
    Decode(String),

    /// An entry tries to escape the target directory.
    #[error("path traversal detected: {path}")]
    PathTraversal { path: String },

    /// The archive has no directory or file entries.
    #[error("archive contains no entries")]
    Empty,

    /// The stop condition fired before all entries were written.
    #[error("extraction interrupted")]
    Interrupted,

    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Io(_) => ErrorKind::Io,
            ExtractError::Interrupted => ErrorKind::Canceled,
            _ => ErrorKind::Decode,
        }
    }

    fn decode(err: io::Error) -> Self {
        ExtractError::Decode(err.to_string())
    }

    /// Errors surfacing while copying an entry come either from the
    /// decompressor (corrupt input) or from the destination file.
    fn from_copy(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
                ExtractError::decode(err)
            }
            _ => ExtractError::Io(err),
        }
    }
}

/// Unpack a `.tar.gz` stream into `target_dir`.
///
/// Returns the first top-level path segment observed, which callers use to
/// locate the module root (GitHub names it `<owner>-<repo>-<sha>`).
///
/// # Errors
///
/// - `Decode` for invalid gzip or tar data
/// - `PathTraversal` for absolute or `..` entry paths
/// - `Empty` if no directory or file entry was found
/// - `Io` if the target cannot be written
pub fn extract_tar_gz<R: Read>(reader: R, target_dir: &Path) -> Result<String, ExtractError> {
    extract_tar_gz_until(reader, target_dir, || false)
}

/// [`extract_tar_gz`] that stops with `Interrupted` once `stop` returns true.
///
/// `stop` is polled before each entry; nothing is written after it fires.
pub fn extract_tar_gz_until<R, F>(
    reader: R,
    target_dir: &Path,
    stop: F,
) -> Result<String, ExtractError>
where
    R: Read,
    F: Fn() -> bool,
{
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut root: Option<String> = None;

    for entry in archive.entries().map_err(ExtractError::decode)? {
        if stop() {
            return Err(ExtractError::Interrupted);
        }
        let mut entry = entry.map_err(ExtractError::decode)?;
        let entry_type = entry.header().entry_type();
        let path = entry.path().map_err(ExtractError::decode)?.into_owned();

        if !entry_type.is_dir() && !entry_type.is_file() {
            debug!(path = %path.display(), ?entry_type, "skipping unsupported archive entry");
            continue;
        }

        validate_entry_path(&path)?;
        let mode = entry.header().mode().map_err(ExtractError::decode)?;
        let dest = target_dir.join(&path);

        if root.is_none() {
            root = top_level_segment(&path);
        }

        if entry_type.is_dir() {
            fs::create_dir_all(&dest)?;
            set_mode(&dest, mode | DIR_OWNER_BITS)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&dest)?;
            io::copy(&mut entry, &mut file).map_err(ExtractError::from_copy)?;
            set_mode(&dest, mode)?;
        }
    }

    root.ok_or(ExtractError::Empty)
}

/// Owner bits kept on every extracted directory.
const DIR_OWNER_BITS: u32 = 0o700;

fn top_level_segment(path: &Path) -> Option<String> {
    path.components().find_map(|c| match c {
        Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// Reject entry paths that would land outside the target directory.
fn validate_entry_path(path: &Path) -> Result<(), ExtractError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
