//! Timeout Guard.
//!
//! Consulted before every phase and between persistence batches. Tripping
//! does not abort the run outright: the current unit of work finishes,
//! subsequent phases are skipped, and persistence falls back to a
//! priority flush (breaking first, then rank-descending).

use std::time::{Duration, Instant};

use super::error::Phase;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    started_at: Instant,
    budget: Duration,
}

impl TimeoutGuard {
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            budget,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// True once the wall-clock budget has been exhausted.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Check the guard before entering `phase`; returns the phase back as
    /// an error marker when tripped, for the orchestrator to log and
    /// short-circuit with.
    pub fn check(&self, phase: Phase) -> Result<(), Phase> {
        if self.is_tripped() {
            Err(phase)
        } else {
            Ok(())
        }
    }
}
