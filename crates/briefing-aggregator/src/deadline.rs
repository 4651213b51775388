//! Time budget for one refresh pass.

use std::time::Duration;

use tokio::time::Instant;

/// Named points in a refresh pass where work stops once its share of the
/// budget is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Before each fetch batch.
    Fetch,
    /// Before enriching each fetched feed.
    Process,
    /// Before trending-topic extraction.
    Topics,
    /// Before the master summary.
    Summary,
}

impl Checkpoint {
    #[must_use]
    pub fn fraction(self) -> f64 {
        match self {
            Checkpoint::Fetch => 0.6,
            Checkpoint::Process => 0.7,
            Checkpoint::Topics => 0.85,
            Checkpoint::Summary => 0.95,
        }
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Checkpoint::Fetch => write!(f, "fetch"),
            Checkpoint::Process => write!(f, "process"),
            Checkpoint::Topics => write!(f, "topics"),
            Checkpoint::Summary => write!(f, "summary"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    #[must_use]
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Whether work gated by `checkpoint` may still start.
    #[must_use]
    pub fn allows(&self, checkpoint: Checkpoint) -> bool {
        self.allows_after(checkpoint, self.elapsed())
    }

    /// `elapsed < fraction × budget`; a zero budget allows nothing.
    #[must_use]
    pub fn allows_after(&self, checkpoint: Checkpoint, elapsed: Duration) -> bool {
        elapsed < self.budget.mul_f64(checkpoint.fraction())
    }
}
