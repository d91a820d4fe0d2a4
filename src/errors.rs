// src/errors.rs

//! Structured apply errors.
//!
//! Everything returned above the raw [`crate::system`] boundary is an
//! [`Error`]: an [`ErrorKind`] plus, for per-resource failures, the identity
//! of the offending resource. Captured command output (when a command
//! failed) is reachable through [`Error::output`] and included in the
//! `Display` rendering.

use std::fmt;
use std::io;

use thiserror::Error as ThisError;

use crate::catalog::Resource;
use crate::dag::GraphError;
use crate::system::RunError;

pub type Result<T> = std::result::Result<T, Error>;

/// Identity of the resource an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: u64,
    pub comment: String,
}

impl ResourceRef {
    pub fn new(resource: &Resource) -> Self {
        Self {
            id: resource.id,
            comment: resource.comment.clone(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comment.is_empty() {
            write!(f, "id={}", self.id)
        } else {
            write!(f, "{} (id={})", self.comment, self.id)
        }
    }
}

/// Classified cause of an apply failure.
#[derive(Debug, ThisError)]
pub enum ErrorKind {
    /// The catalog's dependency structure is invalid.
    #[error(transparent)]
    Construction(#[from] GraphError),

    /// A resource's content is malformed (empty path, relative argv\[0\],
    /// empty environment name, ...).
    #[error("{0}")]
    Validation(String),

    /// An underlying system operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A condition or main command failed to run cleanly.
    #[error("{context}: {source}")]
    Exec {
        context: String,
        #[source]
        source: RunError,
    },

    /// The host's actual state differs in kind from the declared intent.
    #[error("{0}")]
    State(String),

    /// The cancellation token fired.
    #[error("apply cancelled")]
    Cancelled,

    /// Applier logic error; should never happen on a well-formed graph.
    #[error("{0}")]
    Internal(String),

    /// Summary error: at least one resource failed or was skipped.
    #[error("not all resources applied cleanly")]
    NotClean,
}

/// Error returned by the applier and logged per failing resource.
#[derive(Debug)]
pub struct Error {
    resource: Option<ResourceRef>,
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            resource: None,
            kind,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation(message.into()))
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::new(ErrorKind::Io {
            context: context.into(),
            source,
        })
    }

    pub(crate) fn exec(context: impl Into<String>, source: RunError) -> Self {
        Self::new(ErrorKind::Exec {
            context: context.into(),
            source,
        })
    }

    pub(crate) fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State(message.into()))
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    pub(crate) fn not_clean() -> Self {
        Self::new(ErrorKind::NotClean)
    }

    /// Attach the identity of the resource this error belongs to.
    pub(crate) fn with_resource(mut self, resource: &Resource) -> Self {
        self.resource = Some(ResourceRef::new(resource));
        self
    }

    /// The classified cause.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Identity of the offending resource; absent for construction errors
    /// and run-level errors.
    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    /// Captured combined output of a failed command, when there is any.
    pub fn output(&self) -> Option<&[u8]> {
        match &self.kind {
            ErrorKind::Exec { source, .. } => {
                let output = source.output();
                if output.is_empty() {
                    None
                } else {
                    Some(output)
                }
            }
            _ => None,
        }
    }
}

impl From<GraphError> for Error {
    fn from(err: GraphError) -> Self {
        Self::new(ErrorKind::Construction(err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(resource) = &self.resource {
            write!(f, "{resource}: ")?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(output) = self.output() {
            let text = String::from_utf8_lossy(output);
            let text = text.trim_end();
            if !text.is_empty() {
                write!(f, "\noutput:\n{text}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}
