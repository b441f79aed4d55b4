//! Per-target outcomes and the aggregated run result

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Why a target was not attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A target it depends on, directly or transitively, failed
    DependencyFailed(String),
    /// The run was cancelled before the target could finish
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependencyFailed(target) => write!(f, "dependency {target} failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal state of one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Cache hit, tech not invoked
    UpToDate,
    /// Tech ran and published the target
    Built,
    /// Tech failed
    Failed {
        /// Error reported by the tech
        cause: String,
    },
    /// Never attempted
    Skipped {
        /// Why
        reason: SkipReason,
    },
}

impl TargetOutcome {
    /// `UpToDate` or `Built`
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::UpToDate | Self::Built)
    }
}

/// Result of [`crate::MakePlatform::make`]
#[derive(Debug, Clone, Default)]
pub struct MakeReport {
    outcomes: BTreeMap<String, TargetOutcome>,
    duration: Duration,
}

impl MakeReport {
    pub(crate) fn new(outcomes: BTreeMap<String, TargetOutcome>, duration: Duration) -> Self {
        Self { outcomes, duration }
    }

    /// Whether every scheduled target ended `UpToDate` or `Built`
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(TargetOutcome::is_success)
    }

    /// Outcome of one target id (`node/path:target`)
    #[must_use]
    pub fn outcome(&self, target: &str) -> Option<&TargetOutcome> {
        self.outcomes.get(target)
    }

    /// All outcomes keyed by target id
    #[must_use]
    pub fn outcomes(&self) -> &BTreeMap<String, TargetOutcome> {
        &self.outcomes
    }

    /// Targets whose tech failed, with causes
    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            TargetOutcome::Failed { cause } => Some((id.as_str(), cause.as_str())),
            _ => None,
        })
    }

    /// Targets never attempted, with reasons
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            TargetOutcome::Skipped { reason } => Some((id.as_str(), reason)),
            _ => None,
        })
    }

    /// Number of targets rebuilt
    #[must_use]
    pub fn built(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Built))
    }

    /// Number of cache hits
    #[must_use]
    pub fn up_to_date(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::UpToDate))
    }

    fn count(&self, pred: impl Fn(&TargetOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }

    /// Wall-clock time of the run
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Print a human-readable summary
    pub fn display(&self) {
        println!("\n📊 Build Summary:");
        println!("  Targets built:      {}", self.built());
        println!("  Targets up to date: {}", self.up_to_date());
        println!("  Total targets:      {}", self.outcomes.len());
        println!("  Duration:           {:.2}s", self.duration.as_secs_f64());

        let failed: Vec<_> = self.failed().collect();
        if !failed.is_empty() {
            println!("\n❌ Failed:");
            for (target, cause) in failed {
                println!("  {target}: {cause}");
            }
        }

        let skipped: Vec<_> = self.skipped().collect();
        if !skipped.is_empty() {
            println!("\n⏭️  Skipped:");
            for (target, reason) in skipped {
                println!("  {target}: {reason}");
            }
        }
    }
}
