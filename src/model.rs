/// Core data types for the aurora monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// readings, synchronized time series, spatial samples and rasters, the
/// derived signal types, and the feed error taxonomy.
/// It contains no I/O; the only logic is accessors over the types themselves.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single observation from an upstream feed.
///
/// `value` is `None` when the sensor reported a sentinel or the field was
/// missing. A `Reading` never carries a sentinel number; those are stripped
/// by `ingest::sentinel` before a reading is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading<T> {
    pub value: Option<T>,
    pub observed_at: DateTime<Utc>,
}

impl<T: Copy> Reading<T> {
    pub fn new(value: Option<T>, observed_at: DateTime<Utc>) -> Self {
        Self { value, observed_at }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

/// One named numeric channel of a `TimeSeries` (e.g. "speed", "bz").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Timestamps paired with same-length channels of optional values.
///
/// Invariants, enforced by `TimeSeries::push_row` and the assembler:
///   - timestamps are non-decreasing and UTC
///   - every channel has exactly `timestamps.len()` entries
///   - gaps are `None` entries, never shorter channels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub channels: Vec<Channel>,
}

impl TimeSeries {
    /// Creates an empty series with the given channel names.
    pub fn with_channels(names: &[&str]) -> Self {
        Self {
            timestamps: Vec::new(),
            channels: names
                .iter()
                .map(|n| Channel { name: n.to_string(), values: Vec::new() })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Appends one aligned row. Returns `false` (and leaves the series
    /// untouched) if the row would break alignment or ordering.
    pub fn push_row(&mut self, at: DateTime<Utc>, values: &[Option<f64>]) -> bool {
        if values.len() != self.channels.len() {
            return false;
        }
        if let Some(last) = self.timestamps.last() {
            if at < *last {
                return false;
            }
        }
        self.timestamps.push(at);
        for (channel, value) in self.channels.iter_mut().zip(values) {
            channel.values.push(*value);
        }
        true
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// All readings of one channel, in time order.
    pub fn readings(&self, name: &str) -> Vec<Reading<f64>> {
        match self.channel(name) {
            Some(channel) => self
                .timestamps
                .iter()
                .zip(&channel.values)
                .map(|(at, v)| Reading::new(*v, *at))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Most recent reading of a channel that carries a value.
    pub fn latest_present(&self, name: &str) -> Option<Reading<f64>> {
        self.readings(name).into_iter().rev().find(|r| r.is_present())
    }
}

/// Outcome of a best-effort join. `NoData` means zero rows survived,
/// which is distinct from a series whose readings are all absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "series", rename_all = "snake_case")]
pub enum Assembly {
    NoData,
    Series(TimeSeries),
}

impl Assembly {
    pub fn series(&self) -> Option<&TimeSeries> {
        match self {
            Assembly::Series(s) => Some(s),
            Assembly::NoData => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// One OVATION grid point. Longitude may be in [0,360) or [-180,180).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialSample {
    pub longitude: f64,
    pub latitude: f64,
    pub probability: f64,
}

impl SpatialSample {
    pub fn new(longitude: f64, latitude: f64, probability: f64) -> Self {
        Self { longitude, latitude, probability }
    }
}

/// Dense probability grid over a fixed lon/lat window.
///
/// Cells are stored row-major: row index follows `latitudes`, column index
/// follows `longitudes`. A masked cell is `None`; an unmasked cell always
/// holds a value in [0,100].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Raster {
    pub longitudes: Vec<f64>,
    pub latitudes: Vec<f64>,
    pub cells: Vec<Option<f64>>,
}

impl Raster {
    /// An entirely masked raster over the given axes.
    pub fn masked(longitudes: Vec<f64>, latitudes: Vec<f64>) -> Self {
        let cells = vec![None; longitudes.len() * latitudes.len()];
        Self { longitudes, latitudes, cells }
    }

    pub fn width(&self) -> usize {
        self.longitudes.len()
    }

    pub fn height(&self) -> usize {
        self.latitudes.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height() || col >= self.width() {
            return None;
        }
        self.cells[row * self.width() + col]
    }

    pub fn unmasked_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_fully_masked(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }
}

// ---------------------------------------------------------------------------
// Derived signal types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubstormStatus {
    Active,
    Inactive,
}

/// The window statistics a substorm decision was made from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubstormEvidence {
    /// Window maximum, nT.
    pub peak_nt: f64,
    /// Window minimum, nT.
    pub baseline_nt: f64,
    /// Index of the first maximum within the window (0 = oldest).
    pub peak_offset: usize,
    /// Last point of the window, nT.
    pub latest_nt: f64,
}

/// Recomputed from scratch on every evaluation; carries no history.
/// `evidence` is `None` when there was not enough data to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubstormState {
    pub status: SubstormStatus,
    pub evidence: Option<SubstormEvidence>,
}

impl SubstormState {
    pub fn insufficient() -> Self {
        Self { status: SubstormStatus::Inactive, evidence: None }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubstormStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConditionCategory {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl std::fmt::Display for ConditionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionCategory::Poor => write!(f, "Poor"),
            ConditionCategory::Fair => write!(f, "Fair"),
            ConditionCategory::Good => write!(f, "Good"),
            ConditionCategory::Excellent => write!(f, "Excellent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConditionScore {
    pub score: u8,
    pub category: ConditionCategory,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding an upstream feed.
///
/// These never escape the core's public operations; they are carried inside
/// `FetchOutcome::Unavailable` so callers can log and degrade.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Non-2xx HTTP response.
    Http(u16),
    /// Connection-level failure (DNS, TLS, reset, ...).
    Transport(String),
    /// The request exceeded the configured timeout.
    Timeout,
    /// The body could not be decoded as the feed's payload kind.
    Parse(String),
    /// The feed answered but held nothing usable.
    NoDataAvailable(String),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Http(code) => write!(f, "HTTP error: {}", code),
            FeedError::Transport(msg) => write!(f, "Transport error: {}", msg),
            FeedError::Timeout => write!(f, "Request timeout"),
            FeedError::Parse(msg) => write!(f, "Parse error: {}", msg),
            FeedError::NoDataAvailable(feed) => write!(f, "No data available for feed: {}", feed),
        }
    }
}

impl std::error::Error for FeedError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
