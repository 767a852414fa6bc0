//! Delete command implementation

use super::{parse_id, Context};
use anyhow::Result;

/// Remove one book, forgetting it as the last opened book if it was
pub async fn delete(ctx: &Context, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    ctx.library.delete(&id).await?;

    if ctx.pointer.load().await.as_ref() == Some(&id) {
        ctx.pointer.clear().await;
    }

    println!("Deleted {}", id);
    Ok(())
}
