//! `treemake clean`

use super::{CommandResult, Project};
use std::path::Path;

/// Remove the requested targets (everything when empty)
pub fn clean(dir: &Path, mode: &str, targets: &[String]) -> CommandResult<()> {
    println!("🧹 Cleaning build outputs...");
    println!();

    let project = Project::open(dir, mode)?;
    let platform = project.platform(mode)?;
    let report = platform.clean(targets)?;
    project.cache.save()?;

    println!("✅ Clean finished");
    println!();
    println!("Removed:");
    println!("  Target files: {}", report.targets);
    println!("  Temp files:   {}", report.tmp_files);

    Ok(())
}
