// src/system/mock.rs

//! In-memory [`System`] used by the apply tests.
//!
//! Keeps a flat `path -> entry` namespace behind a mutex and records every
//! invocation in order, so tests can pin down exactly which operations ran
//! and in what sequence. Command results are scripted per program path;
//! unscripted programs succeed with empty output.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use super::{Cmd, FileInfo, FileKind, RunError, System};

/// One simulated filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File { content: Vec<u8>, mode: u32 },
    Dir { mode: u32 },
    Symlink { target: PathBuf },
    /// Something the applier cannot manage (socket, device, ...).
    Other,
}

impl MockEntry {
    fn info(&self) -> FileInfo {
        match self {
            MockEntry::File { mode, .. } => FileInfo {
                kind: FileKind::Regular,
                mode: *mode,
            },
            MockEntry::Dir { mode } => FileInfo {
                kind: FileKind::Directory,
                mode: *mode,
            },
            MockEntry::Symlink { .. } => FileInfo {
                kind: FileKind::Symlink,
                mode: 0o777,
            },
            MockEntry::Other => FileInfo {
                kind: FileKind::Other,
                mode: 0,
            },
        }
    }
}

/// A recorded [`System`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Lstat(PathBuf),
    Mkdir(PathBuf, u32),
    /// `(target, link)`, mirroring the trait's argument order.
    Symlink(PathBuf, PathBuf),
    Readlink(PathBuf),
    Remove(PathBuf),
    WriteFile(PathBuf, u32),
    Run(Cmd),
}

impl Call {
    /// True for calls that can mutate simulated state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::Mkdir(..) | Call::Symlink(..) | Call::Remove(..) | Call::WriteFile(..)
        )
    }
}

/// Scripted result for `run`, keyed by program path.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Exit with the given status; zero means success.
    Exit { code: i32, output: Vec<u8> },
    /// The program cannot be started.
    StartFailure,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<PathBuf, MockEntry>,
    calls: Vec<Call>,
    run_results: HashMap<PathBuf, RunOutcome>,
    write_errors: HashMap<PathBuf, io::ErrorKind>,
    /// Cancel this token as a side effect of running the given program.
    cancel_on_run: Option<(PathBuf, CancellationToken)>,
}

/// Recording in-memory system.
#[derive(Debug, Default)]
pub struct MockSystem {
    inner: Mutex<Inner>,
    root: PathBuf,
}

impl MockSystem {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            root: PathBuf::from("/"),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>, mode: u32) {
        self.inner.lock().unwrap().entries.insert(
            path.as_ref().to_path_buf(),
            MockEntry::File {
                content: content.into(),
                mode,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.inner
            .lock()
            .unwrap()
            .entries
            .insert(path.as_ref().to_path_buf(), MockEntry::Dir { mode: 0o755 });
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        self.inner.lock().unwrap().entries.insert(
            path.as_ref().to_path_buf(),
            MockEntry::Symlink {
                target: target.as_ref().to_path_buf(),
            },
        );
    }

    pub fn add_other(&self, path: impl AsRef<Path>) {
        self.inner
            .lock()
            .unwrap()
            .entries
            .insert(path.as_ref().to_path_buf(), MockEntry::Other);
    }

    /// Make every `write_file` against `path` fail with the given kind.
    pub fn fail_writes(&self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.inner
            .lock()
            .unwrap()
            .write_errors
            .insert(path.as_ref().to_path_buf(), kind);
    }

    /// Script the outcome of running `program`.
    pub fn script_run(&self, program: impl AsRef<Path>, outcome: RunOutcome) {
        self.inner
            .lock()
            .unwrap()
            .run_results
            .insert(program.as_ref().to_path_buf(), outcome);
    }

    /// Cancel `token` as a side effect of running `program` (after its
    /// scripted result is produced).
    pub fn cancel_on_run(&self, program: impl AsRef<Path>, token: CancellationToken) {
        self.inner.lock().unwrap().cancel_on_run =
            Some((program.as_ref().to_path_buf(), token));
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Current entry at `path`, if any.
    pub fn entry(&self, path: impl AsRef<Path>) -> Option<MockEntry> {
        self.inner.lock().unwrap().entries.get(path.as_ref()).cloned()
    }

    /// Snapshot of the whole simulated filesystem.
    pub fn entries(&self) -> HashMap<PathBuf, MockEntry> {
        self.inner.lock().unwrap().entries.clone()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no entry at {:?}", path))
}

impl System for MockSystem {
    fn local_root(&self) -> &Path {
        &self.root
    }

    fn lstat(&self, path: &Path) -> io::Result<FileInfo> {
        self.record(Call::Lstat(path.to_path_buf()));
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .get(path)
            .map(MockEntry::info)
            .ok_or_else(|| not_found(path))
    }

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.record(Call::Mkdir(path.to_path_buf(), mode));
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("entry exists at {:?}", path),
            ));
        }
        inner
            .entries
            .insert(path.to_path_buf(), MockEntry::Dir { mode });
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.record(Call::Symlink(target.to_path_buf(), link.to_path_buf()));
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(link) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("entry exists at {:?}", link),
            ));
        }
        inner.entries.insert(
            link.to_path_buf(),
            MockEntry::Symlink {
                target: target.to_path_buf(),
            },
        );
        Ok(())
    }

    fn readlink(&self, path: &Path) -> io::Result<PathBuf> {
        self.record(Call::Readlink(path.to_path_buf()));
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(path) {
            Some(MockEntry::Symlink { target }) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {:?}", path),
            )),
            None => Err(not_found(path)),
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.record(Call::Remove(path.to_path_buf()));
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.remove(path).is_none() {
            return Err(not_found(path));
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        self.record(Call::WriteFile(path.to_path_buf(), mode));
        let mut inner = self.inner.lock().unwrap();
        if let Some(&kind) = inner.write_errors.get(path) {
            return Err(io::Error::new(kind, format!("scripted failure at {:?}", path)));
        }
        inner.entries.insert(
            path.to_path_buf(),
            MockEntry::File {
                content: contents.to_vec(),
                mode,
            },
        );
        Ok(())
    }

    fn run<'a>(
        &'a self,
        token: &'a CancellationToken,
        cmd: &'a Cmd,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, RunError>> + Send + 'a>> {
        Box::pin(async move {
            if token.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            self.record(Call::Run(cmd.clone()));

            let (outcome, cancel) = {
                let inner = self.inner.lock().unwrap();
                let outcome = inner.run_results.get(&cmd.path).cloned();
                let cancel = match &inner.cancel_on_run {
                    Some((program, token)) if program == &cmd.path => Some(token.clone()),
                    _ => None,
                };
                (outcome, cancel)
            };

            if let Some(token) = cancel {
                token.cancel();
            }

            match outcome {
                None => Ok(Vec::new()),
                Some(RunOutcome::Exit { code: 0, output }) => Ok(output),
                Some(RunOutcome::Exit { code, output }) => Err(RunError::Exit { code, output }),
                Some(RunOutcome::StartFailure) => Err(RunError::Start(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such program: {:?}", cmd.path),
                ))),
            }
        })
    }
}
