//! `treemake cache`

use super::{CommandResult, Project};
use std::path::Path;

/// Show cache location and size
pub fn info(dir: &Path, mode: &str) -> CommandResult<()> {
    let project = Project::open(dir, mode)?;

    println!("ℹ️  Cache Information");
    println!();

    if !project.cache.path().exists() {
        println!("No cache found at: {}", project.cache.path().display());
        println!();
        println!("Run a build to create the cache.");
        return Ok(());
    }

    println!("Cache file:     {}", project.cache.path().display());
    println!("Cached targets: {}", project.cache.len());
    println!();
    println!("Available commands:");
    println!("  treemake cache clear  - Forget every fingerprint");
    println!("  treemake clean        - Remove built targets");

    Ok(())
}

/// Drop every entry and persist the empty cache
pub fn clear(dir: &Path, mode: &str) -> CommandResult<()> {
    let project = Project::open(dir, mode)?;
    let removed = project.cache.len();
    project.cache.clear();
    project.cache.save()?;

    println!("✅ Cache cleared ({removed} entries removed)");
    Ok(())
}
