/// Kp forecast and hemispheric power summaries.
///
/// Everything here is relative to an injected `now` so results are
/// deterministic in tests.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::ingest::swpc::{HemiPowerPoint, KpForecastRow, KpObservation};

/// Forecast max Kp assumed for a day with no forecast rows.
pub const QUIET_DAY_KP: f64 = 2.0;

/// Forecast rows this far in the past still count toward today.
pub const OUTLOOK_LOOKBACK_HOURS: i64 = 3;

pub const KP_HISTORY_HOURS: i64 = 48;

// ---------------------------------------------------------------------------
// G-scale
// ---------------------------------------------------------------------------

/// NOAA G-scale for a Kp value: G1 at Kp 5, up to G5 at Kp 9-.
pub fn g_scale_from_kp(kp: f64) -> u8 {
    match kp {
        k if k >= 8.67 => 5,
        k if k >= 7.67 => 4,
        k if k >= 6.67 => 3,
        k if k >= 5.67 => 2,
        k if k >= 5.00 => 1,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// 3-day outlook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyOutlook {
    pub date: NaiveDate,
    /// Rounded to one decimal.
    pub max_kp: f64,
    pub g_scale: u8,
}

/// Max forecast Kp for today and the next two UTC days.
pub fn three_day_outlook(rows: &[KpForecastRow], now: DateTime<Utc>) -> Vec<DailyOutlook> {
    let cutoff = now - Duration::hours(OUTLOOK_LOOKBACK_HOURS);
    let today = now.date_naive();

    (0..3)
        .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
        .map(|date| {
            let max_kp = rows
                .iter()
                .filter(|r| r.time >= cutoff && r.time.date_naive() == date)
                .map(|r| r.kp)
                .fold(None, |acc: Option<f64>, kp| Some(acc.map_or(kp, |a| a.max(kp))))
                .unwrap_or(QUIET_DAY_KP);
            DailyOutlook {
                date,
                max_kp: (max_kp * 10.0).round() / 10.0,
                g_scale: g_scale_from_kp(max_kp),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Kp history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpHistoryPoint {
    pub time: DateTime<Utc>,
    pub kp: f64,
    pub observed: bool,
}

/// Rows from the last 48 hours onward, forecast included.
pub fn kp_history(rows: &[KpForecastRow], now: DateTime<Utc>) -> Vec<KpHistoryPoint> {
    let cutoff = now - Duration::hours(KP_HISTORY_HOURS);
    rows.iter()
        .filter(|r| r.time >= cutoff)
        .map(|r| KpHistoryPoint {
            time: r.time,
            kp: r.kp,
            observed: r.kind == KpObservation::Observed,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Hemispheric power
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerLevel {
    Quiet,
    Low,
    Moderate,
    Elevated,
    High,
    Extreme,
}

pub fn power_level(gigawatts: f64) -> PowerLevel {
    match gigawatts {
        p if p < 30.0 => PowerLevel::Quiet,
        p if p < 50.0 => PowerLevel::Low,
        p if p < 80.0 => PowerLevel::Moderate,
        p if p < 100.0 => PowerLevel::Elevated,
        p if p < 150.0 => PowerLevel::High,
        _ => PowerLevel::Extreme,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HemiPowerSummary {
    pub points: Vec<HemiPowerPoint>,
    /// Most recent north value of the whole product, not just the window.
    pub current_gw: f64,
    pub level: PowerLevel,
}

/// Display window: the last 2 hours when that holds at least 5 points,
/// otherwise the last 6 hours, otherwise the last 60 points.
pub fn hemi_power_window(points: &[HemiPowerPoint], now: DateTime<Utc>) -> Vec<HemiPowerPoint> {
    let since = |hours: i64| -> Vec<HemiPowerPoint> {
        let cutoff = now - Duration::hours(hours);
        points.iter().filter(|p| p.observed_at >= cutoff).copied().collect()
    };

    let recent = since(2);
    if recent.len() >= 5 {
        return recent;
    }
    let extended = since(6);
    if !extended.is_empty() {
        return extended;
    }
    points[points.len().saturating_sub(60)..].to_vec()
}

pub fn summarize_hemi_power(points: &[HemiPowerPoint], now: DateTime<Utc>) -> Option<HemiPowerSummary> {
    let current_gw = points.last()?.north_gw;
    Some(HemiPowerSummary {
        points: hemi_power_window(points, now),
        current_gw,
        level: power_level(current_gw),
    })
}
