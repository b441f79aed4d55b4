//! `treemake make`

use super::{CommandResult, Project};
use std::path::Path;
use treemake::{CancelToken, MakeRequest};
use tracing::warn;

/// Build the requested targets. Returns whether every target succeeded.
pub async fn make(
    dir: &Path,
    mode: &str,
    targets: Vec<String>,
    force: Vec<String>,
    jobs: Option<usize>,
) -> CommandResult<bool> {
    let project = Project::open(dir, mode)?;
    let mut platform = project.platform(mode)?;
    if let Some(jobs) = jobs {
        platform.options_mut().jobs = jobs.max(1);
    }

    println!("🔨 Building {} ({} mode)", project.root.display(), mode);
    println!("  Workers: {}", platform.options().jobs);
    println!();

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing running targets");
            on_interrupt.cancel();
        }
    });

    let result = platform
        .make(MakeRequest {
            targets,
            force,
            cancel,
        })
        .await;
    interrupt.abort();

    project.cache.save()?;
    let report = result?;
    report.display();

    let stats = project.cache.stats();
    println!();
    println!("💾 Cache: {} entries, {:.1}% hit rate", stats.entries, stats.hit_rate());

    if report.is_success() {
        println!("\n✅ Build succeeded");
    } else {
        println!("\n❌ Build failed");
    }
    Ok(report.is_success())
}
