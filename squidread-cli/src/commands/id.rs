//! Id command implementation

use anyhow::{Context, Result};
use rayon::prelude::*;
use squidread_core::compute_id;
use std::path::{Path, PathBuf};

/// Print the content id of each file, in argument order
pub fn id(files: &[PathBuf]) -> Result<()> {
    let ids = files
        .par_iter()
        .map(|path| hash_file(path))
        .collect::<Result<Vec<_>>>()?;

    for (path, id) in files.iter().zip(ids) {
        println!("{}  {}", id, path.display());
    }
    Ok(())
}

fn hash_file(path: &Path) -> Result<String> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(compute_id(&content).to_string())
}
