//! Import command implementation

use super::Context;
use anyhow::{bail, Context as _, Result};
use indicatif::{ProgressBar, ProgressStyle};
use squidread_core::{is_epub_file, ImportOutcome};
use std::path::{Path, PathBuf};

/// Import each file, skipping anything that is not an EPUB
pub async fn import(ctx: &Context, files: &[PathBuf]) -> Result<()> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );

    let mut added = 0;
    let mut present = 0;
    let mut failed = 0;

    for path in files {
        pb.set_message(display_name(path));
        match import_one(ctx, path).await {
            Ok(ImportOutcome::Added(record)) => {
                added += 1;
                pb.suspend(|| println!("Added {}  {}", record.id, record.title));
            }
            Ok(ImportOutcome::AlreadyPresent(record)) => {
                present += 1;
                pb.suspend(|| {
                    println!("Already in library {}  {}", record.id, record.title)
                });
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Failed to import {}: {:#}", path.display(), e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "Import complete: {} added, {} already present, {} failed",
        added, present, failed
    );

    if failed > 0 {
        bail!("{} of {} file(s) could not be imported", failed, files.len());
    }
    Ok(())
}

async fn import_one(ctx: &Context, path: &Path) -> Result<ImportOutcome> {
    let name = display_name(path);
    if !is_epub_file(&name, None) {
        bail!("{} is not an EPUB file", name);
    }

    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let outcome = ctx.library.import(&name, content).await?;
    ctx.pointer.remember(&outcome.record().id).await;
    Ok(outcome)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
