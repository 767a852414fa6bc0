//! Open and locate commands

use super::{parse_id, Context};
use anyhow::{Context as _, Result};
use squidread_core::{BookRecord, LibraryError, LocationToken};

/// Mark a book as opened and print where reading resumes
///
/// Without an id, reopens the last opened book. A pointer to a book that
/// has since been deleted is cleared and the most recently used book is
/// opened instead.
pub async fn open(ctx: &Context, id: Option<&str>) -> Result<()> {
    let record = match id {
        Some(id) => ctx.library.open(&parse_id(id)?).await?,
        None => resume(ctx).await?,
    };
    ctx.pointer.remember(&record.id).await;

    println!("Opened {}  {}", record.id, record.title);
    match &record.last_location {
        Some(location) => println!("Resume at: {}", location),
        None => println!("Resume at: start of book"),
    }
    Ok(())
}

async fn resume(ctx: &Context) -> Result<BookRecord> {
    if let Some(id) = ctx.pointer.load().await {
        match ctx.library.open(&id).await {
            Ok(record) => return Ok(record),
            Err(LibraryError::NotFound(_)) => {
                tracing::info!("Last opened book {} is gone", id);
                ctx.pointer.clear().await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let recent = ctx
        .library
        .most_recent()
        .await?
        .context("Library is empty")?;
    Ok(ctx.library.open(&recent.id).await?)
}

/// Store a reading location for a book; an empty token clears it
pub async fn locate(ctx: &Context, id: &str, token: &str) -> Result<()> {
    let id = parse_id(id)?;
    let token = token.trim();
    let location = (!token.is_empty()).then(|| LocationToken::new(token));

    let record = ctx.library.set_location(&id, location).await?;
    match &record.last_location {
        Some(location) => println!("Saved location for {}: {}", record.id, location),
        None => println!("Cleared location for {}", record.id),
    }
    Ok(())
}
