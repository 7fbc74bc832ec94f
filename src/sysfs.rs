//! Guarded access to kernel control files.
//!
//! A control node that does not exist or cannot be opened is an expected
//! situation (the node belongs to hardware this device does not have), so it
//! is reported as a skip rather than as an error. Only an I/O failure after
//! the guards passed is a [`SysfsError`].

use std::{
    ffi::CString,
    fmt, fs, io,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::debug;
use thiserror::Error;

/// Minimal filesystem surface used by the reader and the writer.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Whether the current process may open `path` for reading.
    fn is_readable(&self, path: &Path) -> bool;

    /// Whether the current process may open `path` for writing.
    fn is_writable(&self, path: &Path) -> bool;

    fn read_text(&self, path: &Path) -> io::Result<String>;

    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()>;
}

impl<F: Filesystem + ?Sized> Filesystem for Arc<F> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_readable(&self, path: &Path) -> bool {
        (**self).is_readable(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        (**self).is_writable(path)
    }

    fn read_text(&self, path: &Path) -> io::Result<String> {
        (**self).read_text(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        (**self).write_text(path, contents)
    }
}

/// Production backend over the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysFs;

impl SysFs {
    fn access(path: &Path, mode: libc::c_int) -> bool {
        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            return false;
        };
        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
    }
}

impl Filesystem for SysFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_readable(&self, path: &Path) -> bool {
        Self::access(path, libc::R_OK)
    }

    fn is_writable(&self, path: &Path) -> bool {
        Self::access(path, libc::W_OK)
    }

    fn read_text(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }
}

/// Why a read or write was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Missing,
    NotReadable,
    NotWritable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Missing => f.write_str("does not exist"),
            SkipReason::NotReadable => f.write_str("is not readable"),
            SkipReason::NotWritable => f.write_str("is not writable"),
        }
    }
}

/// Result of a guarded write that did not fail with an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped(SkipReason),
}

/// Result of a guarded read that did not fail with an I/O error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// File contents with surrounding whitespace removed.
    Read(String),
    Skipped(SkipReason),
}

/// I/O failure on a node that passed the existence and permission guards.
#[derive(Debug, Error)]
pub enum SysfsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Stateless writer that guards every write on existence and writability.
pub struct SysfsWriter<F: Filesystem> {
    fs: F,
}

impl<F: Filesystem> SysfsWriter<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Writes `value` plus a trailing newline to `path` in one call.
    ///
    /// There is no retry; the next apply cycle is the next attempt.
    pub fn write(&self, path: &Path, value: &str) -> Result<WriteOutcome, SysfsError> {
        if !self.fs.exists(path) {
            debug!("{} {}", path.display(), SkipReason::Missing);
            return Ok(WriteOutcome::Skipped(SkipReason::Missing));
        }
        if !self.fs.is_writable(path) {
            debug!("{} {}", path.display(), SkipReason::NotWritable);
            return Ok(WriteOutcome::Skipped(SkipReason::NotWritable));
        }

        self.fs
            .write_text(path, &format!("{value}\n"))
            .map(|()| WriteOutcome::Written)
            .map_err(|source| SysfsError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Stateless reader with the same guards as [`SysfsWriter`].
pub struct SysfsReader<F: Filesystem> {
    fs: F,
}

impl<F: Filesystem> SysfsReader<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Reads `path` and trims the trailing newline the kernel appends.
    pub fn read(&self, path: &Path) -> Result<ReadOutcome, SysfsError> {
        if !self.fs.exists(path) {
            debug!("{} {}", path.display(), SkipReason::Missing);
            return Ok(ReadOutcome::Skipped(SkipReason::Missing));
        }
        if !self.fs.is_readable(path) {
            debug!("{} {}", path.display(), SkipReason::NotReadable);
            return Ok(ReadOutcome::Skipped(SkipReason::NotReadable));
        }

        self.fs
            .read_text(path)
            .map(|contents| ReadOutcome::Read(contents.trim().to_string()))
            .map_err(|source| SysfsError::Read {
                path: path.to_path_buf(),
                source,
            })
    }
}
