//! Baseline and velocity computation.
//!
//! Z-score velocity uses the historical standard deviation when a topic
//! has enough rolling history, falling back to a Poisson approximation
//! otherwise. Division-by-zero is guarded explicitly rather than relying
//! on float semantics (a zero denominator yields a defined z rather than
//! NaN/Inf).

use super::model::RollingBaseline;

const Z_MIN: f64 = -2.0;
const Z_MAX: f64 = 10.0;

/// Current activity counts the scorer needs, all deduped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentActivity {
    pub current_1h: i32,
    pub current_6h: i32,
    pub current_24h: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct VelocityResult {
    pub z_score: f64,
    pub baseline_quality: f64,
    pub velocity: f64,
    pub velocity_6h: f64,
    pub acceleration: f64,
}

/// Compute z-score velocity and the supporting velocity/acceleration
/// figures for one topic.
#[must_use]
pub fn compute_velocity(baseline: &RollingBaseline, activity: CurrentActivity) -> VelocityResult {
    let has_history = baseline.has_historical_baseline();
    let current_1h = f64::from(activity.current_1h);

    let (z_score, baseline_quality) = if has_history && baseline.stddev_7d > 0.0 {
        let raw = (current_1h - baseline.baseline_7d) / baseline.stddev_7d;
        (clamp_z(raw), 1.0)
    } else {
        let conservative_baseline = (current_1h / 3.0).max(0.5);
        let poisson_sd = conservative_baseline.max(1.0).sqrt();
        let quality = if has_history { 1.0 } else { 0.6 };
        let raw = ((current_1h - conservative_baseline) / poisson_sd) * quality;
        (clamp_z(raw), quality)
    };

    let velocity = if baseline.baseline_7d > 0.0 {
        ((current_1h - baseline.baseline_7d) / baseline.baseline_7d) * 100.0
    } else {
        current_1h * 50.0
    };

    let rate_6h = f64::from(activity.current_6h) / 6.0;
    let velocity_6h = if baseline.baseline_7d > 0.0 {
        ((rate_6h - baseline.baseline_7d) / baseline.baseline_7d) * 100.0
    } else {
        rate_6h * 50.0
    };

    let acceleration = if rate_6h > 0.0 {
        ((current_1h - rate_6h) / rate_6h) * 100.0
    } else if current_1h > 0.0 {
        100.0
    } else {
        0.0
    };

    VelocityResult {
        z_score,
        baseline_quality,
        velocity,
        velocity_6h,
        acceleration,
    }
}

fn clamp_z(z: f64) -> f64 {
    z.clamp(Z_MIN, Z_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_score_uses_historical_stddev_when_available() {
        let baseline = RollingBaseline {
            baseline_7d: 0.1,
            baseline_30d: 0.1,
            stddev_7d: 0.2,
            data_points_7d: 7,
        };
        let activity = CurrentActivity {
            current_1h: 10,
            current_6h: 20,
            current_24h: 30,
        };
        let result = compute_velocity(&baseline, activity);
        // (10 - 0.1) / 0.2 = 49.5, clamped to 10.
        assert!((result.z_score - 10.0).abs() < f64::EPSILON);
        assert!((result.baseline_quality - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn z_score_falls_back_to_poisson_without_history() {
        let baseline = RollingBaseline::default();
        let activity = CurrentActivity {
            current_1h: 3,
            current_6h: 6,
            current_24h: 9,
        };
        let result = compute_velocity(&baseline, activity);
        assert!((result.baseline_quality - 0.6).abs() < f64::EPSILON);
        // conservative_baseline = max(0.5, 1.0) = 1.0, poisson_sd = 1.0
        // raw = (3 - 1.0) / 1.0 * 0.6 = 1.2
        assert!((result.z_score - 1.2).abs() < 1e-9);
    }

    #[test]
    fn velocity_falls_back_when_baseline_is_zero() {
        let baseline = RollingBaseline {
            baseline_7d: 0.0,
            baseline_30d: 0.0,
            stddev_7d: 0.0,
            data_points_7d: 5,
        };
        let activity = CurrentActivity {
            current_1h: 4,
            current_6h: 4,
            current_24h: 4,
        };
        let result = compute_velocity(&baseline, activity);
        assert!((result.velocity - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn z_score_clamps_to_range() {
        let baseline = RollingBaseline {
            baseline_7d: 0.1,
            baseline_30d: 0.1,
            stddev_7d: 0.05,
            data_points_7d: 7,
        };
        let activity = CurrentActivity {
            current_1h: 100,
            current_6h: 100,
            current_24h: 100,
        };
        let result = compute_velocity(&baseline, activity);
        assert!((result.z_score - 10.0).abs() < f64::EPSILON);
    }
}
