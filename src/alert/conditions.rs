//! Aurora viewing conditions.
//!
//! Pure functions over the latest indices and solar wind values. A missing
//! input never fails a computation; it simply contributes nothing.

use serde::Serialize;

use crate::model::{ConditionCategory, ConditionScore};

// ---------------------------------------------------------------------------
// Condition score
// ---------------------------------------------------------------------------

fn kp_points(kp: Option<f64>) -> u8 {
    match kp {
        Some(k) if k >= 6.0 => 3,
        Some(k) if k >= 4.0 => 2,
        Some(k) if k >= 3.0 => 1,
        _ => 0,
    }
}

fn speed_points(speed_km_s: Option<f64>) -> u8 {
    match speed_km_s {
        Some(v) if v >= 600.0 => 2,
        Some(v) if v >= 500.0 => 1,
        _ => 0,
    }
}

/// Southward (negative) Bz couples the solar wind into the magnetosphere.
fn bz_points(bz_nt: Option<f64>) -> u8 {
    match bz_nt {
        Some(b) if b < -5.0 => 3,
        Some(b) if b < -2.0 => 2,
        Some(b) if b < 0.0 => 1,
        _ => 0,
    }
}

fn storm_points(g_scale: Option<u8>) -> u8 {
    match g_scale {
        Some(g) if g >= 3 => 2,
        Some(g) if g >= 1 => 1,
        _ => 0,
    }
}

pub fn categorize(score: u8) -> ConditionCategory {
    match score {
        s if s >= 7 => ConditionCategory::Excellent,
        s if s >= 5 => ConditionCategory::Good,
        s if s >= 3 => ConditionCategory::Fair,
        _ => ConditionCategory::Poor,
    }
}

/// Sums the four thresholded contributions (0..=10) and buckets the total.
pub fn condition_score(
    kp: Option<f64>,
    speed_km_s: Option<f64>,
    bz_nt: Option<f64>,
    g_scale: Option<u8>,
) -> ConditionScore {
    let score = kp_points(kp) + speed_points(speed_km_s) + bz_points(bz_nt) + storm_points(g_scale);
    ConditionScore { score, category: categorize(score) }
}

// ---------------------------------------------------------------------------
// Visibility likelihood
// ---------------------------------------------------------------------------

/// Text band for the activity index alone; `"Unknown"` without a Kp.
pub fn aurora_likelihood(kp: Option<f64>) -> &'static str {
    match kp {
        None => "Unknown",
        Some(k) if k >= 7.0 => "Very High - Visible at mid-latitudes",
        Some(k) if k >= 6.0 => "High - Visible at higher mid-latitudes",
        Some(k) if k >= 5.0 => "Moderate - Visible at high latitudes",
        Some(k) if k >= 4.0 => "Low - Visible near polar regions",
        Some(_) => "Very Low - Minimal activity",
    }
}

// ---------------------------------------------------------------------------
// Probability by latitude
// ---------------------------------------------------------------------------

/// Percent chance of visibility, rows by rounded Kp 0..=9, columns by
/// latitude band: <50, 50-55, 55-60, 60-65, 65-70, >=70.
const LATITUDE_PROBABILITY: [[u8; 6]; 10] = [
    [0, 0, 0, 5, 15, 40],
    [0, 0, 0, 10, 25, 50],
    [0, 0, 5, 20, 40, 65],
    [0, 0, 15, 35, 55, 75],
    [0, 5, 25, 50, 70, 85],
    [5, 15, 40, 65, 80, 95],
    [15, 30, 55, 75, 90, 95],
    [25, 45, 70, 85, 95, 95],
    [40, 60, 80, 90, 95, 95],
    [55, 75, 90, 95, 95, 95],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Moderate,
    Good,
    Excellent,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::VeryLow => write!(f, "Very Low"),
            Visibility::Low => write!(f, "Low"),
            Visibility::Moderate => write!(f, "Moderate"),
            Visibility::Good => write!(f, "Good"),
            Visibility::Excellent => write!(f, "Excellent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatitudeProbability {
    /// Absolute latitude the lookup used.
    pub latitude: f64,
    pub kp: f64,
    pub probability: u8,
    pub visibility: Visibility,
}

fn latitude_band(abs_latitude: f64) -> usize {
    match abs_latitude {
        l if l < 50.0 => 0,
        l if l < 55.0 => 1,
        l if l < 60.0 => 2,
        l if l < 65.0 => 3,
        l if l < 70.0 => 4,
        _ => 5,
    }
}

pub fn visibility_for(probability: u8) -> Visibility {
    match probability {
        p if p >= 75 => Visibility::Excellent,
        p if p >= 50 => Visibility::Good,
        p if p >= 25 => Visibility::Moderate,
        p if p >= 10 => Visibility::Low,
        _ => Visibility::VeryLow,
    }
}

/// Table lookup by (Kp rounded half-to-even and clamped to 0..=9, band of
/// |latitude|). A missing Kp is read as 0.
pub fn probability_at_latitude(latitude: f64, kp: Option<f64>) -> LatitudeProbability {
    let kp = kp.filter(|k| k.is_finite()).unwrap_or(0.0);
    let abs_latitude = latitude.abs();
    let row = kp.round_ties_even().clamp(0.0, 9.0) as usize;
    let probability = LATITUDE_PROBABILITY[row][latitude_band(abs_latitude)];
    LatitudeProbability {
        latitude: abs_latitude,
        kp,
        probability,
        visibility: visibility_for(probability),
    }
}
