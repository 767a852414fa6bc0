//! Export command implementation

use super::{parse_id, Context};
use anyhow::{Context as _, Result};
use std::path::Path;

/// Write the stored EPUB bytes to `output`
pub async fn export(ctx: &Context, id: &str, output: &Path) -> Result<()> {
    let id = parse_id(id)?;
    let record = ctx.library.get(&id).await?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(output, &record.content)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Exported {} ({} bytes) to {}",
        record.title,
        record.content.len(),
        output.display()
    );
    Ok(())
}
