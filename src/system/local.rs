// src/system/local.rs

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Cmd, FileInfo, FileKind, RunError, System};

/// [`System`] backed by the host: `std::fs` for filesystem syscalls,
/// `tokio::process` for command execution.
#[derive(Debug, Clone)]
pub struct LocalSystem {
    root: PathBuf,
}

impl LocalSystem {
    /// Local system with `/` as the default working directory for commands.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    /// Override the default working directory (must be absolute).
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }
}

impl Default for LocalSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn file_info(metadata: &fs::Metadata) -> FileInfo {
    let ft = metadata.file_type();
    let kind = if ft.is_symlink() {
        FileKind::Symlink
    } else if ft.is_dir() {
        FileKind::Directory
    } else if ft.is_file() {
        FileKind::Regular
    } else {
        FileKind::Other
    };

    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o7777
    };
    #[cfg(not(unix))]
    let mode = 0;

    FileInfo { kind, mode }
}

impl System for LocalSystem {
    fn local_root(&self) -> &Path {
        &self.root
    }

    fn lstat(&self, path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::symlink_metadata(path)?;
        Ok(file_info(&metadata))
    }

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new().mode(mode).create(path)
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
            fs::DirBuilder::new().create(path)
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, link)
        }
        #[cfg(not(unix))]
        {
            let _ = (target, link);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "symlink resources require a unix host",
            ))
        }
    }

    fn readlink(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        // `symlink_metadata` both surfaces NotFound and tells us whether to
        // use remove_dir (directory symlinks are files here, not dirs).
        let metadata = fs::symlink_metadata(path)?;
        if metadata.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
        })?;
        let parent = path.parent().unwrap_or_else(|| Path::new("/"));

        // Sibling temp path so the rename stays on one filesystem. The write
        // itself surfaces NotFound when the parent directory is missing.
        let tmp = parent.join(format!(".{}.catapply-tmp", file_name.to_string_lossy()));

        let result = (|| {
            fs::write(&tmp, contents)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))?;
            }
            #[cfg(not(unix))]
            let _ = mode;
            fs::rename(&tmp, path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn run<'a>(
        &'a self,
        token: &'a CancellationToken,
        cmd: &'a Cmd,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, RunError>> + Send + 'a>> {
        Box::pin(async move {
            debug!(program = %cmd.path.display(), dir = %cmd.dir.display(), "spawning command");

            let mut command = Command::new(&cmd.path);
            command
                .args(&cmd.args)
                .env_clear()
                .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .current_dir(&cmd.dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                // Dropping the child (e.g. on cancellation) terminates it.
                .kill_on_drop(true);

            let child = command.spawn().map_err(RunError::Start)?;

            let output = tokio::select! {
                result = child.wait_with_output() => result.map_err(RunError::Wait)?,
                () = token.cancelled() => return Err(RunError::Cancelled),
            };

            let mut combined = output.stdout;
            combined.extend_from_slice(&output.stderr);

            if output.status.success() {
                Ok(combined)
            } else {
                Err(RunError::Exit {
                    code: output.status.code().unwrap_or(-1),
                    output: combined,
                })
            }
        })
    }
}
