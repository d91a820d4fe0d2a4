#![allow(dead_code)]

use std::path::PathBuf;

use catapply::catalog::{
    Catalog, CommandKind, CommandSpec, Condition, EnvVar, ExecResource, FileResource, FileState,
    Payload, Resource,
};

/// Build a [`Catalog`] from resources.
pub fn catalog(resources: Vec<Resource>) -> Catalog {
    Catalog { resources }
}

/// Command spec from an argv slice, with empty environment and no working
/// directory.
pub fn argv_spec(parts: &[&str]) -> CommandSpec {
    CommandSpec {
        kind: CommandKind::Argv(parts.iter().map(|s| s.to_string()).collect()),
        environment: vec![],
        working_directory: None,
    }
}

/// Builder for [`Resource`] to simplify test setup.
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    fn new(id: u64, payload: Payload) -> Self {
        Self {
            resource: Resource {
                id,
                comment: String::new(),
                dependencies: vec![],
                payload,
            },
        }
    }

    pub fn noop(id: u64) -> Self {
        Self::new(id, Payload::Noop {})
    }

    pub fn plain(id: u64, path: &str, content: Option<&str>) -> Self {
        Self::new(
            id,
            Payload::File(FileResource {
                path: PathBuf::from(path),
                mode: None,
                state: FileState::Plain {
                    content: content.map(str::to_string),
                },
            }),
        )
    }

    pub fn directory(id: u64, path: &str) -> Self {
        Self::new(
            id,
            Payload::File(FileResource {
                path: PathBuf::from(path),
                mode: None,
                state: FileState::Directory,
            }),
        )
    }

    pub fn symlink(id: u64, path: &str, target: &str) -> Self {
        Self::new(
            id,
            Payload::File(FileResource {
                path: PathBuf::from(path),
                mode: None,
                state: FileState::Symlink {
                    target: PathBuf::from(target),
                },
            }),
        )
    }

    pub fn absent(id: u64, path: &str) -> Self {
        Self::new(
            id,
            Payload::File(FileResource {
                path: PathBuf::from(path),
                mode: None,
                state: FileState::Absent,
            }),
        )
    }

    pub fn exec(id: u64, argv: &[&str]) -> Self {
        Self::new(
            id,
            Payload::Exec(ExecResource {
                command: argv_spec(argv),
                condition: Condition::Always,
            }),
        )
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.resource.comment = comment.to_string();
        self
    }

    pub fn after(mut self, id: u64) -> Self {
        self.resource.dependencies.push(id);
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        if let Payload::File(f) = &mut self.resource.payload {
            f.mode = Some(mode);
        }
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        if let Payload::Exec(e) = &mut self.resource.payload {
            e.condition = condition;
        }
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        if let Payload::Exec(e) = &mut self.resource.payload {
            e.command.environment.push(EnvVar {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        self
    }

    pub fn working_dir(mut self, dir: &str) -> Self {
        if let Payload::Exec(e) = &mut self.resource.payload {
            e.command.working_directory = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn build(self) -> Resource {
        self.resource
    }
}
