// src/lib.rs

pub mod apply;
pub mod catalog;
pub mod cli;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod system;

use std::io::Read;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::apply::Applier;
use crate::catalog::{loader, Catalog};
use crate::cli::CliArgs;
use crate::system::LocalSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - catalog loading (file argument or stdin)
/// - Ctrl-C → cancellation token
/// - the applier against the local system
pub async fn run(args: CliArgs) -> Result<()> {
    let catalog = read_catalog(&args)?;
    debug!(resources = catalog.resources.len(), "catalog decoded");

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            token.cancel();
        });
    }

    let system = LocalSystem::new();
    let applier = Applier::new(&system);
    applier.apply(&token, &catalog).await?;
    Ok(())
}

fn read_catalog(args: &CliArgs) -> Result<Catalog> {
    match args.catalog.as_deref() {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading catalog from stdin")?;
            loader::parse(&buf).context("parsing catalog from stdin")
        }
        Some(path) => loader::load_from_path(path),
    }
}
