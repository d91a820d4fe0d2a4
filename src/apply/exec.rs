// src/apply/exec.rs

use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::catalog::{CommandKind, CommandSpec, Condition, ExecResource};
use crate::errors::{Error, Result};
use crate::system::{Cmd, System};

/// Evaluate the condition, then run the main command if it allows it.
///
/// A condition that decides against running is a *success*: the resource is
/// marked done without touching the host.
pub(super) async fn apply_exec<S: System>(
    system: &S,
    token: &CancellationToken,
    exec: &ExecResource,
) -> Result<()> {
    match &exec.condition {
        Condition::Always => {}

        Condition::OnlyIf(probe) => {
            let cmd = build_command(probe, system.local_root())
                .map_err(|msg| Error::validation(format!("condition: {msg}")))?;
            match system.run(token, &cmd).await {
                // Zero exit: proceed to the main command.
                Ok(_) => {}
                // Non-zero exit: skip silently.
                Err(err) if err.is_exit() => {
                    debug!("only_if probe exited non-zero; skipping command");
                    return Ok(());
                }
                Err(err) => return Err(Error::exec("condition", err)),
            }
        }

        Condition::Unless(probe) => {
            let cmd = build_command(probe, system.local_root())
                .map_err(|msg| Error::validation(format!("condition: {msg}")))?;
            match system.run(token, &cmd).await {
                // Zero exit: skip silently.
                Ok(_) => {
                    debug!("unless probe exited zero; skipping command");
                    return Ok(());
                }
                // Non-zero exit: proceed to the main command.
                Err(err) if err.is_exit() => {}
                Err(err) => return Err(Error::exec("condition", err)),
            }
        }

        Condition::FileAbsent(path) => match system.lstat(path) {
            // Present: skip silently.
            Ok(_) => {
                debug!(path = %path.display(), "file present; skipping command");
                return Ok(());
            }
            // Absent: proceed.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::io(
                    format!("condition: lstat {}", path.display()),
                    e,
                ))
            }
        },
    }

    let cmd = build_command(&exec.command, system.local_root())
        .map_err(|msg| Error::validation(format!("command: {msg}")))?;
    match system.run(token, &cmd).await {
        Ok(_) => Ok(()),
        Err(err) => Err(Error::exec("command", err)),
    }
}

/// Resolve a catalog command spec into a runnable [`Cmd`].
///
/// The environment is exactly the declared pairs, in order — no inheritance
/// from the host. An empty working directory falls back to `local_root`.
fn build_command(spec: &CommandSpec, local_root: &Path) -> std::result::Result<Cmd, String> {
    let CommandKind::Argv(argv) = &spec.kind;

    let Some((program, args)) = argv.split_first() else {
        return Err("0-length argv".to_string());
    };
    if !Path::new(program).is_absolute() {
        return Err(format!("argv[0] ({program:?}) is not an absolute path"));
    }

    let mut env = Vec::with_capacity(spec.environment.len());
    for (i, var) in spec.environment.iter().enumerate() {
        if var.name.is_empty() {
            return Err(format!("environment[{i}] missing name"));
        }
        env.push((var.name.clone(), var.value.clone()));
    }

    let dir = match &spec.working_directory {
        Some(dir) if !dir.as_os_str().is_empty() => {
            if !dir.is_absolute() {
                return Err(format!("working directory {dir:?} is not absolute"));
            }
            dir.clone()
        }
        _ => local_root.to_path_buf(),
    };

    Ok(Cmd {
        path: PathBuf::from(program),
        args: args.to_vec(),
        env,
        dir,
    })
}
