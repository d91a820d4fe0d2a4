// src/system/mod.rs

//! OS abstraction used by the applier.
//!
//! Every side effect flows through the [`System`] trait so the apply
//! pipeline can be exercised against an in-memory implementation
//! ([`mock::MockSystem`]) in tests. [`local::LocalSystem`] is the real
//! thing.

use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod local;
pub mod mock;

pub use local::LocalSystem;

/// Kind of a filesystem entry as reported by [`System::lstat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    /// Sockets, FIFOs, devices — anything the applier has no business
    /// touching.
    Other,
}

/// Subset of `lstat` output the applier cares about.
#[derive(Debug, Clone, Copy)]
pub struct FileInfo {
    pub kind: FileKind,
    /// Permission bits (the low 12 bits of `st_mode`).
    pub mode: u32,
}

impl FileInfo {
    pub fn is_regular(&self) -> bool {
        self.kind == FileKind::Regular
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

/// A fully resolved command, ready to hand to [`System::run`].
///
/// `path` is the program (argv\[0\], always absolute), `args` the remaining
/// arguments. `env` is the *entire* child environment, in order —
/// implementations must not let the host environment leak in. `dir` is
/// always absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub path: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub dir: PathBuf,
}

/// Error from [`System::run`].
///
/// A non-zero exit is distinguishable from a failure to start the process;
/// an exit failure carries whatever combined output was captured.
#[derive(Debug, Error)]
pub enum RunError {
    /// The process ran to completion and exited non-zero. A
    /// signal-terminated child reports `code = -1`.
    #[error("exited with status {code}")]
    Exit { code: i32, output: Vec<u8> },

    /// The process could not be started at all.
    #[error("starting process")]
    Start(#[source] io::Error),

    /// The process started but waiting on it failed.
    #[error("waiting for process")]
    Wait(#[source] io::Error),

    /// The cancellation token fired while the process was running; the
    /// child has been requested to terminate.
    #[error("command cancelled")]
    Cancelled,
}

impl RunError {
    /// Captured combined stdout+stderr, if the process got far enough to
    /// produce any.
    pub fn output(&self) -> &[u8] {
        match self {
            RunError::Exit { output, .. } => output,
            _ => &[],
        }
    }

    /// True when the process ran to completion and exited non-zero.
    pub fn is_exit(&self) -> bool {
        matches!(self, RunError::Exit { .. })
    }
}

/// Abstract OS interface: filesystem metadata and mutation, plus process
/// execution.
///
/// Filesystem methods report [`io::Error`] so callers distinguish
/// `AlreadyExists` / `NotFound` the same way they would against `std::fs`.
pub trait System: Send + Sync + Debug {
    /// Absolute default working directory for commands that configure none.
    fn local_root(&self) -> &Path;

    /// Stat without following symlinks.
    fn lstat(&self, path: &Path) -> io::Result<FileInfo>;

    /// Create a directory with the given permission bits. Must fail with
    /// `ErrorKind::AlreadyExists` when the path already exists.
    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Create a symlink at `link` pointing at `target`. Must fail with
    /// `ErrorKind::AlreadyExists` when `link` already exists.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Read a symlink's target.
    fn readlink(&self, path: &Path) -> io::Result<PathBuf>;

    /// Remove a file, symlink, or empty directory. Must fail with
    /// `ErrorKind::NotFound` when there is nothing at `path`.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Atomically replace the contents of `path` with the given permission
    /// bits: stage to a sibling temp file, then rename into place. Fails if
    /// the parent directory does not exist.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()>;

    /// Run a command to completion, capturing combined stdout+stderr.
    ///
    /// Implementations must honour `token`: when it fires mid-run the child
    /// is requested to terminate and `RunError::Cancelled` is returned.
    fn run<'a>(
        &'a self,
        token: &'a CancellationToken,
        cmd: &'a Cmd,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, RunError>> + Send + 'a>>;
}
