// src/apply/driver.rs

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::catalog::{Catalog, Payload, Resource};
use crate::dag::DepGraph;
use crate::errors::{Error, Result};
use crate::system::System;

use super::{exec, file};

/// Drives a catalog to completion against a [`System`].
///
/// Execution is strictly sequential: one resource at a time, lowest ready id
/// first, so two applies of the same catalog against identical host state
/// issue identical system calls. The system is borrowed for the duration of
/// the apply call and never touched afterwards.
#[derive(Debug)]
pub struct Applier<'s, S> {
    system: &'s S,
}

impl<'s, S: System> Applier<'s, S> {
    pub fn new(system: &'s S) -> Self {
        Self { system }
    }

    /// Apply every resource in the catalog.
    ///
    /// Individual resource failures do not abort the run; their dependents
    /// are skipped and a summary "not clean" error is returned at the end.
    /// Construction errors and cancellation abort immediately.
    pub async fn apply(&self, token: &CancellationToken, catalog: &Catalog) -> Result<()> {
        let mut graph = DepGraph::new(&catalog.resources)?;
        let mut clean = true;

        while !graph.done() {
            if token.is_cancelled() {
                return Err(Error::cancelled());
            }

            let ready = graph.ready();
            let Some(&handle) = ready.first() else {
                return Err(Error::internal("graph not done, but has nothing to do"));
            };

            let resource = graph.resource(handle);
            info!("applying: {}", resource.display_name());

            match self.apply_resource(token, resource).await {
                Ok(()) => graph.mark(handle),
                Err(err) => {
                    clean = false;
                    error!("{}", err.with_resource(resource));

                    let skipped = graph.mark_failure(handle);
                    if !skipped.is_empty() {
                        let names: Vec<String> = skipped
                            .iter()
                            .map(|&h| graph.resource(h).display_name())
                            .collect();
                        info!(
                            "skipping due to failure of {}: {}",
                            resource.display_name(),
                            names.join(", ")
                        );
                    }
                }
            }
        }

        if clean {
            Ok(())
        } else {
            Err(Error::not_clean())
        }
    }

    async fn apply_resource(&self, token: &CancellationToken, resource: &Resource) -> Result<()> {
        match &resource.payload {
            Payload::Noop {} => Ok(()),
            Payload::File(f) => file::apply_file(self.system, f),
            Payload::Exec(e) => exec::apply_exec(self.system, token, e).await,
        }
    }
}
