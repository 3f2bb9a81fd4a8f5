//! Breaking Detection.
//!
//! Breaking evaluation requires tier1/tier2 corroboration and the volume
//! gate; the first matching path in the ordered A..F list wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakingPath {
    FreshSpike,
    ExtremeZscore,
    HighRankFresh,
    BaselineSurge,
    HighCorroboration,
    ExtremeActivity,
}

impl BreakingPath {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BreakingPath::FreshSpike => "A:fresh_spike",
            BreakingPath::ExtremeZscore => "B:extreme_zscore",
            BreakingPath::HighRankFresh => "C:high_rank_fresh",
            BreakingPath::BaselineSurge => "D:baseline_surge",
            BreakingPath::HighCorroboration => "E:high_corroboration",
            BreakingPath::ExtremeActivity => "F:extreme_activity",
        }
    }
}

pub struct BreakingInputs {
    pub has_tier12_corroboration: bool,
    pub volume_gate: bool,
    pub z_score: f64,
    pub news_source_count: i32,
    pub age_hours: f64,
    pub rank_score: f64,
    pub has_historical_baseline: bool,
    pub baseline_delta: f64,
    pub source_families: i32,
    pub corroboration_score: i32,
    pub current_1h: i32,
    pub current_6h: i32,
}

/// `current_1h` unless zero, in which case a short-window activity proxy
/// kicks in so a just-broke topic isn't starved by bucket-alignment lag.
#[must_use]
pub fn effective_current_1h(inputs: &BreakingInputs) -> i32 {
    if inputs.current_1h != 0 {
        return inputs.current_1h;
    }
    if inputs.current_6h >= 5 && inputs.source_families >= 2 && inputs.age_hours < 4.0 {
        return (inputs.current_6h + 1) / 2;
    }
    if inputs.source_families >= 3 && inputs.age_hours < 2.0 {
        return 5.min(inputs.source_families + inputs.news_source_count);
    }
    0
}

/// Evaluate the ordered breaking paths. Returns `None` if no path matches
/// or the corroboration/volume preconditions fail.
#[must_use]
pub fn evaluate(inputs: &BreakingInputs) -> Option<BreakingPath> {
    if !inputs.has_tier12_corroboration || !inputs.volume_gate {
        return None;
    }

    let effective_1h = effective_current_1h(inputs);

    if inputs.z_score > 3.0 && inputs.news_source_count >= 1 && inputs.age_hours < 8.0 {
        return Some(BreakingPath::FreshSpike);
    }
    if inputs.z_score >= 4.0 && inputs.news_source_count >= 1 && inputs.age_hours < 24.0 {
        return Some(BreakingPath::ExtremeZscore);
    }
    if inputs.rank_score >= 60.0 && inputs.z_score > 2.0 && inputs.age_hours < 4.0 {
        return Some(BreakingPath::HighRankFresh);
    }
    if inputs.has_historical_baseline
        && inputs.baseline_delta > 4.0
        && inputs.source_families >= 2
        && inputs.age_hours < 12.0
    {
        return Some(BreakingPath::BaselineSurge);
    }
    if inputs.corroboration_score >= 6 && effective_1h >= 5 && inputs.age_hours < 6.0 {
        return Some(BreakingPath::HighCorroboration);
    }
    if effective_1h >= 8 && inputs.news_source_count >= 2 && inputs.age_hours < 3.0 {
        return Some(BreakingPath::ExtremeActivity);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> BreakingInputs {
        BreakingInputs {
            has_tier12_corroboration: true,
            volume_gate: true,
            z_score: 0.0,
            news_source_count: 0,
            age_hours: 100.0,
            rank_score: 0.0,
            has_historical_baseline: false,
            baseline_delta: 0.0,
            source_families: 0,
            corroboration_score: 0,
            current_1h: 0,
            current_6h: 0,
        }
    }

    #[test]
    fn extreme_zscore_path_wins_over_fresh_spike_when_only_b_matches() {
        let mut inputs = base_inputs();
        inputs.z_score = 3.5;
        inputs.news_source_count = 1;
        inputs.age_hours = 10.0; // too old for A (age<8) but within B (age<24)
        assert_eq!(evaluate(&inputs), Some(BreakingPath::ExtremeZscore));
    }

    #[test]
    fn fresh_spike_wins_when_both_a_and_b_match() {
        let mut inputs = base_inputs();
        inputs.z_score = 10.0;
        inputs.news_source_count = 2;
        inputs.age_hours = 3.0;
        assert_eq!(evaluate(&inputs), Some(BreakingPath::FreshSpike));
    }

    #[test]
    fn no_corroboration_blocks_breaking() {
        let mut inputs = base_inputs();
        inputs.has_tier12_corroboration = false;
        inputs.z_score = 10.0;
        inputs.news_source_count = 5;
        inputs.age_hours = 1.0;
        assert_eq!(evaluate(&inputs), None);
    }

    #[test]
    fn effective_current_1h_proxies_when_zero() {
        let mut inputs = base_inputs();
        inputs.current_1h = 0;
        inputs.current_6h = 10;
        inputs.source_families = 2;
        inputs.age_hours = 1.0;
        assert_eq!(effective_current_1h(&inputs), 5);
    }
}
