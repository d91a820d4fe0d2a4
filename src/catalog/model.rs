// src/catalog/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// A decoded catalog: the resources to apply, in declaration order.
///
/// Declaration order is *not* execution order. Execution order is derived
/// from resource ids and dependency edges (see [`crate::dag`]).
///
/// The TOML shape accepted by the CLI loader:
///
/// ```toml
/// [[resource]]
/// id = 1
/// comment = "web root"
/// file = { path = "/srv/www", state = "directory" }
///
/// [[resource]]
/// id = 2
/// comment = "index page"
/// dependencies = [1]
///
/// [resource.file]
/// path = "/srv/www/index.html"
/// state = { plain = { content = "hello\n" } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    /// All resources from `[[resource]]` tables.
    #[serde(default, rename = "resource")]
    pub resources: Vec<Resource>,
}

/// A single named unit of desired host state.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    /// Unique non-zero identifier within the catalog.
    pub id: u64,

    /// Free-form human label used in logs; may be empty.
    #[serde(default)]
    pub comment: String,

    /// Ids of resources that must be applied before this one.
    ///
    /// Not necessarily sorted; duplicates within one list are tolerated and
    /// collapsed during graph construction.
    #[serde(default)]
    pub dependencies: Vec<u64>,

    /// What kind of state this resource declares.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Resource {
    /// Log label: the comment when present, always including the id.
    pub fn display_name(&self) -> String {
        if self.comment.is_empty() {
            format!("id={}", self.id)
        } else {
            format!("{} (id={})", self.comment, self.id)
        }
    }
}

/// Tagged resource body.
///
/// Closed sum on purpose: adding a variant requires a matching executor
/// branch, so an open hierarchy would buy nothing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// No effect; useful as a join point in the dependency graph.
    Noop {},
    /// Desired state for a filesystem path.
    File(FileResource),
    /// A conditional command execution.
    Exec(ExecResource),
}

/// Desired state for a single filesystem path.
#[derive(Debug, Clone, Deserialize)]
pub struct FileResource {
    /// Absolute path this resource manages.
    pub path: PathBuf,

    /// Permission bits applied when creating plain files and directories.
    ///
    /// Defaults to `0o666` for plain files and `0o777` for directories,
    /// both subject to the process umask.
    #[serde(default)]
    pub mode: Option<u32>,

    /// Which kind of entry the path should be.
    pub state: FileState,
}

/// The kind of filesystem entry a file resource declares.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// A regular file. With `content` the file is written; without, the
    /// resource only asserts that a regular file already exists.
    Plain {
        #[serde(default)]
        content: Option<String>,
    },
    /// A directory.
    Directory,
    /// A symlink pointing at `target`.
    Symlink { target: PathBuf },
    /// Nothing: whatever lives at the path is removed.
    Absent,
}

/// A conditional command execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecResource {
    /// The command to run when the condition allows it.
    pub command: CommandSpec,

    /// Host-state predicate gating the command; defaults to [`Condition::Always`].
    #[serde(default)]
    pub condition: Condition,
}

/// How a command is specified in the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// The command itself.
    #[serde(flatten)]
    pub kind: CommandKind,

    /// Exact environment for the child process, in order.
    ///
    /// The host environment is never inherited; an empty list means an empty
    /// environment.
    #[serde(default)]
    pub environment: Vec<EnvVar>,

    /// Working directory; must be absolute when set. When unset (or empty)
    /// the system's local root is used.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

/// Command kinds. `argv` is the only kind today; the enum keeps the wire
/// shape closed the same way the file states are.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Explicit argument vector; `argv[0]` must be an absolute program path.
    Argv(Vec<String>),
}

/// One `name=value` pair for a child process environment.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Host-state predicate gating whether an exec resource runs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Unconditional.
    #[default]
    Always,
    /// Run the main command only when the probe exits zero.
    OnlyIf(CommandSpec),
    /// Run the main command only when the probe exits non-zero.
    Unless(CommandSpec),
    /// Run the main command only when nothing exists at the path.
    FileAbsent(PathBuf),
}
