// src/apply/file.rs

use std::io;

use crate::catalog::{FileResource, FileState};
use crate::errors::{Error, Result};
use crate::system::System;

/// Permission bits for plain files written without an explicit mode.
const DEFAULT_FILE_MODE: u32 = 0o666;
/// Permission bits for directories created without an explicit mode.
const DEFAULT_DIR_MODE: u32 = 0o777;

/// Bring one filesystem path into its declared state.
///
/// Each branch is idempotent for states that can be observed: an existing
/// directory, a symlink with the right target, or an already-absent path all
/// succeed without mutating anything.
pub(super) fn apply_file<S: System>(system: &S, file: &FileResource) -> Result<()> {
    if file.path.as_os_str().is_empty() {
        return Err(Error::validation("file path is empty"));
    }
    let path = &file.path;

    match &file.state {
        FileState::Plain {
            content: Some(content),
        } => {
            let mode = file.mode.unwrap_or(DEFAULT_FILE_MODE);
            system
                .write_file(path, content.as_bytes(), mode)
                .map_err(|e| Error::io(format!("write {}", path.display()), e))
        }

        FileState::Plain { content: None } => {
            let info = system
                .lstat(path)
                .map_err(|e| Error::io(format!("lstat {}", path.display()), e))?;
            if !info.is_regular() {
                return Err(Error::state(format!(
                    "{} is not a regular file",
                    path.display()
                )));
            }
            Ok(())
        }

        FileState::Directory => {
            let mode = file.mode.unwrap_or(DEFAULT_DIR_MODE);
            match system.mkdir(path, mode) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Ensure that what exists is a directory.
                    let info = system.lstat(path).map_err(|e| {
                        Error::io(format!("determine state of {}", path.display()), e)
                    })?;
                    if !info.is_dir() {
                        return Err(Error::state(format!(
                            "{} is not a directory",
                            path.display()
                        )));
                    }
                    Ok(())
                }
                Err(e) => Err(Error::io(format!("mkdir {}", path.display()), e)),
            }
        }

        FileState::Symlink { target } => {
            match system.symlink(target, path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    // Ensure that what exists is a symlink before retargeting.
                    let info = system.lstat(path).map_err(|e| {
                        Error::io(format!("determine state of {}", path.display()), e)
                    })?;
                    if !info.is_symlink() {
                        return Err(Error::state(format!(
                            "{} is not a symlink",
                            path.display()
                        )));
                    }
                    let actual = system
                        .readlink(path)
                        .map_err(|e| Error::io(format!("readlink {}", path.display()), e))?;
                    if actual == *target {
                        // Already the correct link.
                        return Ok(());
                    }
                    system
                        .remove(path)
                        .map_err(|e| Error::io(format!("retargeting {}", path.display()), e))?;
                    system
                        .symlink(target, path)
                        .map_err(|e| Error::io(format!("retargeting {}", path.display()), e))
                }
                Err(e) => Err(Error::io(format!("symlink {}", path.display()), e)),
            }
        }

        FileState::Absent => match system.remove(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("remove {}", path.display()), e)),
        },
    }
}
