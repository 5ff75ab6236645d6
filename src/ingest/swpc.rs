/// NOAA SWPC product parsers
///
/// Decodes the JSON and text products listed in `feeds::FEED_REGISTRY`
/// into typed values. SWPC serves two JSON shapes:
///   - tabular: an array of arrays whose row 0 is a header of column names
///   - keyed: an array of objects
/// and has moved products between the two over time, so every accessor
/// here reads a cell by position for tabular rows and by key for keyed rows.
///
/// Product documentation: https://services.swpc.noaa.gov/products/
///
/// All numeric cells pass through `ingest::sentinel`; all timestamps are
/// normalized to UTC. Unparseable rows are skipped, never fatal.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ingest::sentinel;
use crate::model::SpatialSample;

// ============================================================================
// Column layouts
// ============================================================================

/// `plasma-*.json`: time_tag, density, speed, temperature
pub const PLASMA_DENSITY: usize = 1;
pub const PLASMA_SPEED: usize = 2;
pub const PLASMA_TEMPERATURE: usize = 3;

/// `mag-*.json`: time_tag, bx_gsm, by_gsm, bz_gsm, lon_gsm, lat_gsm, bt
pub const MAG_BX: usize = 1;
pub const MAG_BY: usize = 2;
pub const MAG_BZ: usize = 3;
pub const MAG_BT: usize = 6;

const TIME_KEYS: &[&str] = &["time_tag", "time-tag", "time"];

// ============================================================================
// Timestamps
// ============================================================================

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d_%H:%M",
];

/// Parses any SWPC timestamp form into UTC. Naive timestamps are UTC by
/// SWPC convention; offset timestamps are converted.
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = s.trim_end_matches('Z');
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

// ============================================================================
// Row access
// ============================================================================

/// A cell by position (tabular rows) or by the first matching key (keyed rows).
pub fn cell<'a>(row: &'a Value, index: usize, keys: &[&str]) -> Option<&'a Value> {
    match row {
        Value::Array(cells) => cells.get(index),
        Value::Object(map) => keys.iter().find_map(|k| map.get(*k)),
        _ => None,
    }
}

pub fn cell_f64(row: &Value, index: usize, keys: &[&str]) -> Option<f64> {
    cell(row, index, keys).and_then(sentinel::normalize)
}

/// Timestamp of a row, from column 0 or a `time_tag`-like key.
pub fn row_time(row: &Value) -> Option<DateTime<Utc>> {
    cell(row, 0, TIME_KEYS)
        .and_then(Value::as_str)
        .and_then(parse_utc_timestamp)
}

/// Data rows of a JSON array product, with the header split off.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedTable {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Value>,
}

impl FeedTable {
    /// Returns `None` if the payload is not an array at all.
    pub fn from_json(payload: &Value) -> Option<FeedTable> {
        let all = payload.as_array()?;
        let header = all.first().and_then(header_names);
        let skip = usize::from(header.is_some());
        Some(FeedTable { header, rows: all[skip..].to_vec() })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column in the header, if there is one.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.as_ref()?.iter().position(|h| h == name)
    }
}

/// Row 0 is a header when every cell is a string and the first cell is
/// not itself a timestamp.
fn header_names(row: &Value) -> Option<Vec<String>> {
    let cells = row.as_array()?;
    let names: Vec<String> = cells
        .iter()
        .map(|c| c.as_str().map(String::from))
        .collect::<Option<Vec<_>>>()?;
    match names.first() {
        Some(first) if parse_utc_timestamp(first).is_none() => Some(names),
        _ => None,
    }
}

// ============================================================================
// Solar wind snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolarWind {
    pub plasma_time: Option<DateTime<Utc>>,
    pub mag_time: Option<DateTime<Utc>>,
    pub speed: Option<f64>,
    pub density: Option<f64>,
    pub temperature: Option<f64>,
    pub bt: Option<f64>,
    pub bz: Option<f64>,
    pub bx: Option<f64>,
    pub by: Option<f64>,
}

impl SolarWind {
    /// Oldest of the two source timestamps, for staleness checks.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        match (self.plasma_time, self.mag_time) {
            (Some(p), Some(m)) => Some(p.min(m)),
            (p, m) => p.or(m),
        }
    }
}

/// Latest plasma and field values. The two tables are independent: a
/// missing mag table leaves only the field values absent.
pub fn latest_solar_wind(plasma: Option<&FeedTable>, mag: Option<&FeedTable>) -> Option<SolarWind> {
    let p = plasma.and_then(|t| t.rows.last());
    let m = mag.and_then(|t| t.rows.last());
    if p.is_none() && m.is_none() {
        return None;
    }
    Some(SolarWind {
        plasma_time: p.and_then(row_time),
        mag_time: m.and_then(row_time),
        speed: p.and_then(|r| cell_f64(r, PLASMA_SPEED, &["speed"])),
        density: p.and_then(|r| cell_f64(r, PLASMA_DENSITY, &["density"])),
        temperature: p.and_then(|r| cell_f64(r, PLASMA_TEMPERATURE, &["temperature"])),
        bt: m.and_then(|r| cell_f64(r, MAG_BT, &["bt"])),
        bz: m.and_then(|r| cell_f64(r, MAG_BZ, &["bz_gsm", "bz"])),
        bx: m.and_then(|r| cell_f64(r, MAG_BX, &["bx_gsm", "bx"])),
        by: m.and_then(|r| cell_f64(r, MAG_BY, &["by_gsm", "by"])),
    })
}

// ============================================================================
// Indices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpReading {
    pub observed_at: DateTime<Utc>,
    pub kp: f64,
}

/// Most recent row carrying both a timestamp and a valid Kp.
pub fn parse_latest_kp(payload: &Value) -> Option<KpReading> {
    let table = FeedTable::from_json(payload)?;
    table.rows.iter().rev().find_map(|row| {
        let observed_at = row_time(row)?;
        let kp = cell_f64(row, 1, &["Kp", "kp", "kp_index", "estimated_kp"])?;
        Some(KpReading { observed_at, kp })
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoaaScales {
    pub timestamp: String,
    pub g_scale: Option<u8>,
    pub g_text: Option<String>,
    pub r_scale: Option<u8>,
    pub s_scale: Option<u8>,
}

fn scale_number(entry: &Value, key: &str) -> Option<u8> {
    let scale = entry.get(key)?.get("Scale")?;
    let n = sentinel::normalize(scale)?;
    if (0.0..=5.0).contains(&n) { Some(n as u8) } else { None }
}

/// Current conditions are under key `"0"`; later keys are forecasts.
pub fn parse_noaa_scales(payload: &Value) -> Option<NoaaScales> {
    let current = payload.get("0")?;
    let date = current.get("DateStamp").and_then(Value::as_str).unwrap_or("");
    let time = current.get("TimeStamp").and_then(Value::as_str).unwrap_or("");
    Some(NoaaScales {
        timestamp: format!("{} {}", date, time).trim().to_string(),
        g_scale: scale_number(current, "G"),
        g_text: current
            .get("G")
            .and_then(|g| g.get("Text"))
            .and_then(Value::as_str)
            .map(String::from),
        r_scale: scale_number(current, "R"),
        s_scale: scale_number(current, "S"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KpObservation {
    Observed,
    Estimated,
    Predicted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpForecastRow {
    pub time: DateTime<Utc>,
    pub kp: f64,
    pub kind: KpObservation,
}

/// Rows of the Kp forecast product; rows without a time or Kp are skipped.
/// A missing observed/predicted flag is read as predicted.
pub fn parse_kp_forecast(payload: &Value) -> Vec<KpForecastRow> {
    let Some(table) = FeedTable::from_json(payload) else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter_map(|row| {
            let time = row_time(row)?;
            let kp = cell_f64(row, 1, &["kp", "Kp"])?;
            let kind = match cell(row, 2, &["observed"]).and_then(Value::as_str) {
                Some("observed") => KpObservation::Observed,
                Some("estimated") => KpObservation::Estimated,
                _ => KpObservation::Predicted,
            };
            Some(KpForecastRow { time, kp, kind })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DstPoint {
    pub time: DateTime<Utc>,
    pub dst_nt: f64,
}

pub fn parse_dst(payload: &Value) -> Vec<DstPoint> {
    let Some(table) = FeedTable::from_json(payload) else {
        return Vec::new();
    };
    table
        .rows
        .iter()
        .filter_map(|row| {
            Some(DstPoint { time: row_time(row)?, dst_nt: cell_f64(row, 1, &["dst"])? })
        })
        .collect()
}

// ============================================================================
// OVATION aurora grid
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    pub fn contains(&self, latitude: f64) -> bool {
        match self {
            Hemisphere::North => latitude > 0.0,
            Hemisphere::South => latitude < 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OvationGrid {
    pub observation_time: Option<String>,
    pub forecast_time: Option<String>,
    pub samples: Vec<SpatialSample>,
}

/// `coordinates` triples `[lon, lat, aurora]` restricted to one hemisphere.
/// Returns `None` when the payload has no `coordinates` array.
pub fn parse_ovation(payload: &Value, hemisphere: Hemisphere) -> Option<OvationGrid> {
    let coordinates = payload.get("coordinates")?.as_array()?;
    let samples = coordinates
        .iter()
        .filter_map(|triple| {
            let lon = cell_f64(triple, 0, &[])?;
            let lat = cell_f64(triple, 1, &[])?;
            let p = cell_f64(triple, 2, &[])?;
            Some(SpatialSample::new(lon, lat, p))
        })
        .filter(|s| hemisphere.contains(s.latitude))
        .collect();
    let text = |key: &str| payload.get(key).and_then(Value::as_str).map(String::from);
    Some(OvationGrid {
        observation_time: text("Observation Time"),
        forecast_time: text("Forecast Time"),
        samples,
    })
}

// ============================================================================
// Hemispheric power
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HemiPowerPoint {
    pub observed_at: DateTime<Utc>,
    pub north_gw: f64,
    pub south_gw: Option<f64>,
}

/// Text product: `obs_time forecast_time north_gw south_gw`, `#` comments.
pub fn parse_hemi_power(text: &str) -> Vec<HemiPowerPoint> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            let observed_at = parse_utc_timestamp(parts[0])?;
            let north_gw = sentinel::normalize_f64(parts[2].parse().ok())?;
            let south_gw = sentinel::normalize_f64(parts[3].parse().ok());
            Some(HemiPowerPoint { observed_at, north_gw, south_gw })
        })
        .collect()
}

// ============================================================================
// GOES magnetometer
// ============================================================================

/// Hp component of one GOES satellite, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagTrace {
    pub satellite: Option<u32>,
    pub times: Vec<DateTime<Utc>>,
    pub hp_nt: Vec<f64>,
}

impl MagTrace {
    pub fn len(&self) -> usize {
        self.hp_nt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hp_nt.is_empty()
    }
}

/// Keeps entries of the requested satellite with a time and a valid Hp,
/// then the most recent `keep_last` of them.
pub fn parse_goes_trace(payload: &Value, satellite: Option<u32>, keep_last: usize) -> MagTrace {
    let mut points: Vec<(DateTime<Utc>, f64)> = payload
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter(|row| match satellite {
                    Some(id) => row.get("satellite").and_then(Value::as_u64) == Some(u64::from(id)),
                    None => true,
                })
                .filter_map(|row| Some((row_time(row)?, cell_f64(row, usize::MAX, &["Hp"])?)))
                .collect()
        })
        .unwrap_or_default();

    points.sort_by_key(|(t, _)| *t);
    let start = points.len().saturating_sub(keep_last);
    let (times, hp_nt): (Vec<_>, Vec<_>) = points[start..].iter().copied().unzip();
    MagTrace { satellite, times, hp_nt }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
    }

    // --- Timestamps ---------------------------------------------------------

    #[test]
    fn test_parse_utc_timestamp_accepts_swpc_forms() {
        let expected = utc(18, 5);
        for raw in [
            "2024-05-10 18:05:00.000",
            "2024-05-10 18:05:00",
            "2024-05-10T18:05:00",
            "2024-05-10T18:05:00Z",
            "2024-05-10T13:05:00-05:00",
            "2024-05-10_18:05",
            "2024-05-10 18:05",
        ] {
            assert_eq!(parse_utc_timestamp(raw), Some(expected), "failed on '{}'", raw);
        }
    }

    #[test]
    fn test_parse_utc_timestamp_rejects_garbage() {
        assert_eq!(parse_utc_timestamp(""), None);
        assert_eq!(parse_utc_timestamp("time_tag"), None);
        assert_eq!(parse_utc_timestamp("2024-13-40 25:00:00"), None);
    }

    // --- Tables -------------------------------------------------------------

    #[test]
    fn test_feed_table_splits_header_row() {
        let payload = json!([
            ["time_tag", "density", "speed", "temperature"],
            ["2024-05-10 18:00:00.000", "4.1", "512.3", "98000"],
        ]);
        let table = FeedTable::from_json(&payload).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column("speed"), Some(2));
    }

    #[test]
    fn test_feed_table_without_header_keeps_row_zero() {
        let payload = json!([["2024-05-10 18:00:00.000", "4.1"], ["2024-05-10 18:01:00.000", "4.0"]]);
        let table = FeedTable::from_json(&payload).unwrap();
        assert!(table.header.is_none());
        assert_eq!(table.len(), 2);
        assert!(FeedTable::from_json(&json!({"not": "an array"})).is_none());
    }

    // --- Solar wind ---------------------------------------------------------

    #[test]
    fn test_latest_solar_wind_normalizes_sentinels() {
        let plasma = FeedTable::from_json(&json!([
            ["time_tag", "density", "speed", "temperature"],
            ["2024-05-10 18:00:00.000", "4.1", "512.3", "98000"],
            ["2024-05-10 18:05:00.000", "-9999", "655.0", null],
        ]))
        .unwrap();
        let mag = FeedTable::from_json(&json!([
            ["time_tag", "bx_gsm", "by_gsm", "bz_gsm", "lon_gsm", "lat_gsm", "bt"],
            ["2024-05-10 18:05:00.000", "1.2", "-3.4", "-12.6", "290", "-50", "14.9"],
        ]))
        .unwrap();

        let sw = latest_solar_wind(Some(&plasma), Some(&mag)).unwrap();
        assert_eq!(sw.speed, Some(655.0));
        assert_eq!(sw.density, None);
        assert_eq!(sw.temperature, None);
        assert_eq!(sw.bz, Some(-12.6));
        assert_eq!(sw.bt, Some(14.9));
        assert_eq!(sw.observed_at(), Some(utc(18, 5)));
    }

    #[test]
    fn test_latest_solar_wind_survives_missing_mag() {
        let plasma = FeedTable::from_json(&json!([
            ["time_tag", "density", "speed", "temperature"],
            ["2024-05-10 18:05:00.000", "3.0", "480", "70000"],
        ]))
        .unwrap();
        let sw = latest_solar_wind(Some(&plasma), None).unwrap();
        assert_eq!(sw.speed, Some(480.0));
        assert_eq!(sw.bz, None);
        assert!(latest_solar_wind(None, None).is_none());
    }

    // --- Indices ------------------------------------------------------------

    #[test]
    fn test_parse_latest_kp_tabular_and_keyed() {
        let tabular = json!([
            ["time_tag", "Kp", "a_running", "station_count"],
            ["2024-05-10 15:00:00.000", "7.33", "154", "8"],
            ["2024-05-10 18:00:00.000", "8.67", "300", "8"],
        ]);
        let kp = parse_latest_kp(&tabular).unwrap();
        assert_eq!(kp.kp, 8.67);
        assert_eq!(kp.observed_at, utc(18, 0));

        let keyed = json!([
            {"time_tag": "2024-05-10T18:00:00", "Kp": 5.0},
            {"time_tag": "2024-05-10T21:00:00", "Kp": null},
        ]);
        assert_eq!(parse_latest_kp(&keyed).unwrap().kp, 5.0);
    }

    #[test]
    fn test_parse_noaa_scales_current_entry() {
        let payload = json!({
            "0": {
                "DateStamp": "2024-05-10", "TimeStamp": "18:00:00",
                "G": {"Scale": "4", "Text": "severe"},
                "R": {"Scale": "1", "Text": "minor"},
                "S": {"Scale": null, "Text": null}
            },
            "1": {"G": {"Scale": "3"}}
        });
        let scales = parse_noaa_scales(&payload).unwrap();
        assert_eq!(scales.g_scale, Some(4));
        assert_eq!(scales.g_text.as_deref(), Some("severe"));
        assert_eq!(scales.r_scale, Some(1));
        assert_eq!(scales.s_scale, None);
        assert_eq!(scales.timestamp, "2024-05-10 18:00:00");
        assert!(parse_noaa_scales(&json!([])).is_none());
    }

    #[test]
    fn test_parse_kp_forecast_flags() {
        let payload = json!([
            ["time_tag", "kp", "observed", "noaa_scale"],
            ["2024-05-10 15:00:00", "7.67", "observed", "G3"],
            ["2024-05-10 18:00:00", "8.00", "estimated", "G4"],
            ["2024-05-10 21:00:00", "6.33", "predicted", null],
            ["bad time", "5.00", "predicted", null],
        ]);
        let rows = parse_kp_forecast(&payload);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].kind, KpObservation::Observed);
        assert_eq!(rows[1].kind, KpObservation::Estimated);
        assert_eq!(rows[2].kp, 6.33);
    }

    #[test]
    fn test_parse_dst_skips_bad_rows() {
        let payload = json!([
            ["time_tag", "dst"],
            ["2024-05-10 18:00:00", "-112"],
            ["2024-05-10 19:00:00", "oops"],
            ["2024-05-10 20:00:00", "-245"],
        ]);
        let points = parse_dst(&payload);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].dst_nt, -245.0);
    }

    // --- OVATION ------------------------------------------------------------

    #[test]
    fn test_parse_ovation_filters_hemisphere() {
        let payload = json!({
            "Observation Time": "2024-05-10T18:00:00Z",
            "Forecast Time": "2024-05-10T18:40:00Z",
            "coordinates": [[0, 65, 30], [1, -65, 12], [359, 0, 3], [200, 70, "bad"]]
        });
        let north = parse_ovation(&payload, Hemisphere::North).unwrap();
        assert_eq!(north.samples, vec![SpatialSample::new(0.0, 65.0, 30.0)]);
        assert_eq!(north.forecast_time.as_deref(), Some("2024-05-10T18:40:00Z"));

        let south = parse_ovation(&payload, Hemisphere::South).unwrap();
        assert_eq!(south.samples.len(), 1);
        assert!(parse_ovation(&json!({"type": "x"}), Hemisphere::North).is_none());
    }

    // --- Hemispheric power --------------------------------------------------

    #[test]
    fn test_parse_hemi_power_text() {
        let text = "\
# Hemispheric power nowcast
# obs forecast north south
2024-05-10_18:00 2024-05-10_18:30 95 60
2024-05-10_18:05 2024-05-10_18:35 142 -999
garbage line
2024-05-10_18:10 2024-05-10_18:40 n/a 70
";
        let points = parse_hemi_power(text);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].north_gw, 142.0);
        assert_eq!(points[1].south_gw, None);
        assert_eq!(points[0].observed_at, utc(18, 0));
    }

    // --- GOES ---------------------------------------------------------------

    #[test]
    fn test_parse_goes_trace_filters_satellite_and_keeps_tail() {
        let mut rows = Vec::new();
        for minute in 0..10u32 {
            rows.push(json!({
                "time_tag": format!("2024-05-10T18:{:02}:00Z", minute),
                "satellite": 19, "Hp": 90.0 + minute as f64
            }));
            rows.push(json!({
                "time_tag": format!("2024-05-10T18:{:02}:00Z", minute),
                "satellite": 18, "Hp": 50.0
            }));
        }
        rows.push(json!({"time_tag": "2024-05-10T18:10:00Z", "satellite": 19, "Hp": null}));

        let trace = parse_goes_trace(&json!(rows), Some(19), 4);
        assert_eq!(trace.hp_nt, vec![96.0, 97.0, 98.0, 99.0]);
        assert_eq!(trace.times.last(), Some(&utc(18, 9)));

        let other = parse_goes_trace(&json!(rows), Some(18), 120);
        assert_eq!(other.len(), 10);
        assert!(parse_goes_trace(&json!({}), Some(19), 120).is_empty());
    }
}
