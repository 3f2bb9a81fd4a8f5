//! Error types for the detection pipeline.
//!
//! `anyhow::Result` is used at the service boundary (the HTTP handler and
//! the orchestrator); these typed enums mark the module boundaries where a
//! caller needs to branch on what went wrong, mirroring `ConfigError` in
//! `crate::config`.

use thiserror::Error;

/// Which phase of the pipeline was executing when a run aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    LoadAliases,
    LoadTiers,
    LoadBaselines,
    LoadMentions,
    LoadPriorEvents,
    Aggregate,
    Cluster,
    Score,
    Persist,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::LoadAliases => "load_aliases",
            Phase::LoadTiers => "load_tiers",
            Phase::LoadBaselines => "load_baselines",
            Phase::LoadMentions => "load_mentions",
            Phase::LoadPriorEvents => "load_prior_events",
            Phase::Aggregate => "aggregate",
            Phase::Cluster => "cluster",
            Phase::Score => "score",
            Phase::Persist => "persist",
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("budget exhausted before phase {0:?}")]
    BudgetExhausted(Phase),

    #[error("mention loader failed for source {source}: {message}")]
    LoaderFailed { source: &'static str, message: String },

    #[error("{phase:?}: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },
}

impl DetectError {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            DetectError::BudgetExhausted(phase) | DetectError::Phase { phase, .. } => *phase,
            DetectError::LoaderFailed { .. } => Phase::LoadMentions,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("batch {index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}
