/// Substorm detection from GOES magnetometer Hp traces.
///
/// A three-part test over the most recent window of 1-minute points:
/// magnitude (the window spans at least `SPIKE_THRESHOLD_NT`), recency
/// (the first maximum sits in the newest `RECENT_POINTS`), and persistence
/// (the latest point is still `PERSISTENCE_FRACTION` of `SPIKE_THRESHOLD_NT`
/// above the window minimum, 20 nT with the defaults). The persistence
/// cutoff does not scale with the size of the spike, so a large storm that
/// has partly relaxed stays active. The state is recomputed from scratch on
/// every call.

use crate::config::SubstormConfig;
use crate::ingest::swpc::MagTrace;
use crate::logging::{self, DataSource};
use crate::model::{SubstormEvidence, SubstormState, SubstormStatus};

/// Points evaluated per decision, at the expected cadence.
pub const WINDOW_POINTS: usize = 20;

/// The peak must fall within this many newest points of the window.
pub const RECENT_POINTS: usize = 15;

/// Minimum max-min excursion within the window, nT.
pub const SPIKE_THRESHOLD_NT: f64 = 40.0;

/// Fraction of `SPIKE_THRESHOLD_NT` the latest point must keep above the minimum.
pub const PERSISTENCE_FRACTION: f64 = 0.5;

/// Sampling interval the window sizes assume, seconds.
pub const EXPECTED_CADENCE_SECS: i64 = 60;

/// Allowed deviation of the mean sampling interval from the expected one.
pub const CADENCE_TOLERANCE_FRACTION: f64 = 0.25;

/// Classifies a bare Hp sequence (oldest first) with the default tuning.
pub fn detect(hp_trace: &[f64]) -> SubstormState {
    detect_with(hp_trace, &SubstormConfig::default())
}

/// Classifies a bare Hp sequence. Non-finite points are ignored; fewer than
/// `window_points` usable points is insufficient evidence.
pub fn detect_with(hp_trace: &[f64], config: &SubstormConfig) -> SubstormState {
    let clean: Vec<f64> = hp_trace.iter().copied().filter(|v| v.is_finite()).collect();
    if config.window_points == 0 || clean.len() < config.window_points {
        return SubstormState::insufficient();
    }
    let window = &clean[clean.len() - config.window_points..];

    let mut peak_offset = 0;
    let mut peak = window[0];
    let mut baseline = window[0];
    for (i, v) in window.iter().enumerate() {
        if *v > peak {
            peak = *v;
            peak_offset = i;
        }
        baseline = baseline.min(*v);
    }
    let latest = window[window.len() - 1];
    let height = peak - baseline;

    let spiked = height >= config.spike_threshold_nt;
    let recent = peak_offset >= config.window_points.saturating_sub(config.recent_points);
    let persists = latest >= baseline + config.persistence_fraction * config.spike_threshold_nt;

    let status = if spiked && recent && persists {
        SubstormStatus::Active
    } else {
        SubstormStatus::Inactive
    };

    SubstormState {
        status,
        evidence: Some(SubstormEvidence {
            peak_nt: peak,
            baseline_nt: baseline,
            peak_offset,
            latest_nt: latest,
        }),
    }
}

/// Classifies a timestamped trace after checking that the newest window
/// really is at the cadence the window sizes assume. A trace at the wrong
/// cadence is reported as insufficient evidence.
pub fn detect_trace(trace: &MagTrace, config: &SubstormConfig) -> SubstormState {
    let label = trace
        .satellite
        .map(|s| format!("GOES-{}", s))
        .unwrap_or_else(|| "GOES".to_string());

    if trace.len() < config.window_points || config.window_points < 2 {
        logging::debug(
            DataSource::Substorm,
            Some(&label),
            &format!("{} points, need {}", trace.len(), config.window_points),
        );
        return SubstormState::insufficient();
    }

    let times = &trace.times[trace.times.len() - config.window_points..];
    let span = (times[times.len() - 1] - times[0]).num_seconds() as f64;
    let mean_step = span / (config.window_points - 1) as f64;
    let expected = config.cadence_secs as f64;
    if (mean_step - expected).abs() > expected * CADENCE_TOLERANCE_FRACTION {
        logging::warn(
            DataSource::Substorm,
            Some(&label),
            &format!(
                "mean sample interval {:.0}s, expected {}s; skipping detection",
                mean_step, config.cadence_secs
            ),
        );
        return SubstormState::insufficient();
    }

    detect_with(&trace.hp_nt, config)
}

/// Overall state across satellites: active if any one is active.
pub fn combine(states: &[SubstormState]) -> SubstormState {
    states
        .iter()
        .find(|s| s.is_active())
        .or_else(|| states.iter().find(|s| s.evidence.is_some()))
        .copied()
        .unwrap_or_else(SubstormState::insufficient)
}
