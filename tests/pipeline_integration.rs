/// End-to-end dashboard passes over recorded SWPC payloads
///
/// These tests write a fixture directory, point the service at it through
/// `DevMode`, and run complete passes. No network access is needed.
///
/// The fixture set deliberately leaves out `kyoto-dst`, so every pass also
/// exercises an unavailable feed.
///
/// Run with: cargo test --test pipeline_integration

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

use auromon_service::config::ServiceConfig;
use auromon_service::dashboard;
use auromon_service::dev_mode::{DevMode, FIXTURE_BASE_URL};
use auromon_service::feeds::FeedId;
use auromon_service::model::{ConditionCategory, SubstormStatus};
use auromon_service::verify::{self, VerificationStatus};

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

fn capture_time() -> DateTime<Utc> {
    "2024-05-10T20:00:00Z".parse().unwrap()
}

fn stamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Ten rows at one-minute spacing ending at the capture time.
fn plasma_rows() -> Value {
    let mut rows = vec![json!(["time_tag", "density", "speed", "temperature"])];
    for i in (0..10).rev() {
        let t = capture_time() - ChronoDuration::minutes(i);
        rows.push(json!([stamp(t), "5.2", format!("{}", 640 - i), "150000"]));
    }
    Value::Array(rows)
}

/// Seven rows; the mag product lags the plasma product here. Row 3 carries
/// the `-9999` fill value for Bz.
fn mag_rows() -> Value {
    let mut rows = vec![json!(["time_tag", "bx_gsm", "by_gsm", "bz_gsm", "lon_gsm", "lat_gsm", "bt"])];
    for i in (3..10).rev() {
        let t = capture_time() - ChronoDuration::minutes(i);
        let bz = if i == 6 { "-9999".to_string() } else { "-7.5".to_string() };
        rows.push(json!([stamp(t), "1.1", "-2.0", bz, "150.0", "-30.0", "9.8"]));
    }
    Value::Array(rows)
}

/// A band of aurora around 65N on every meridian, plus a few southern
/// points that the northern field must ignore.
fn ovation() -> Value {
    let mut coordinates = Vec::new();
    for lon in (0..360).step_by(5) {
        for lat in (40..=84).step_by(2) {
            let d = (lat as f64 - 65.0) / 6.0;
            let p = (60.0 * (-d * d).exp()).round();
            coordinates.push(json!([lon, lat, p]));
        }
        coordinates.push(json!([lon, -65, 90]));
    }
    json!({
        "Observation Time": "2024-05-10T19:55:00Z",
        "Forecast Time": "2024-05-10T20:35:00Z",
        "Data Format": "[Longitude, Latitude, Aurora]",
        "coordinates": coordinates,
    })
}

/// One-minute GOES trace for one satellite: flat at 100 nT, then a 60 nT
/// jump ten minutes before the end that stays up.
fn goes_trace(satellite: u32, spike: bool) -> Value {
    let entries: Vec<Value> = (0..60)
        .rev()
        .map(|i| {
            let t = capture_time() - ChronoDuration::minutes(i);
            let hp = if spike && i < 10 { 160.0 } else { 100.0 };
            json!({
                "time_tag": t.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                "satellite": satellite,
                "Hp": hp,
            })
        })
        .collect();
    Value::Array(entries)
}

fn kp_forecast() -> Value {
    let mut rows = vec![json!(["time_tag", "kp", "observed", "noaa_scale"])];
    for h in (-6..=66).step_by(3) {
        let t = capture_time() + ChronoDuration::hours(h);
        let kind = if h <= 0 { "observed" } else { "predicted" };
        let kp = if h == 9 { "7.67" } else { "4.33" };
        rows.push(json!([stamp(t), kp, kind, null]));
    }
    Value::Array(rows)
}

fn hemi_power() -> String {
    let mut text = String::from("# Hemispheric power\n# obs forecast north south\n");
    for i in (0..12).rev() {
        let obs = capture_time() - ChronoDuration::minutes(5 * i);
        let fc = obs + ChronoDuration::minutes(30);
        text.push_str(&format!(
            "{} {} {} {}\n",
            obs.format("%Y-%m-%d_%H:%M"),
            fc.format("%Y-%m-%d_%H:%M"),
            85 + i,
            40
        ));
    }
    text
}

fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(format!("{}.json", name)), value.to_string()).unwrap();
}

fn write_fixtures(dir: &Path) {
    write_json(dir, "plasma-5-minute", &plasma_rows());
    write_json(dir, "mag-5-minute", &mag_rows());
    write_json(dir, "plasma-2-hour", &plasma_rows());
    write_json(dir, "mag-2-hour", &mag_rows());
    write_json(
        dir,
        "planetary-k-index",
        &json!([
            ["time_tag", "Kp", "a_running", "station_count"],
            ["2024-05-10 15:00:00.000", "6.33", "111", "8"],
            ["2024-05-10 18:00:00.000", "7.00", "132", "8"]
        ]),
    );
    write_json(
        dir,
        "noaa-scales",
        &json!({
            "0": {
                "DateStamp": "2024-05-10",
                "TimeStamp": "19:55:00",
                "R": {"Scale": "0", "Text": "none"},
                "S": {"Scale": "0", "Text": "none"},
                "G": {"Scale": "4", "Text": "Severe"}
            }
        }),
    );
    write_json(dir, "ovation-aurora", &ovation());
    write_json(dir, "goes-mag-primary", &goes_trace(19, true));
    write_json(dir, "goes-mag-secondary", &goes_trace(18, false));
    write_json(dir, "kp-forecast", &kp_forecast());
    fs::write(dir.join("hemi-power.txt"), hemi_power()).unwrap();
    fs::write(dir.join("now.txt"), "2024-05-10T20:00:00Z\n").unwrap();
}

fn fixture_config() -> ServiceConfig {
    let mut config = ServiceConfig::default().with_base_url(FIXTURE_BASE_URL);
    config.backoff = Duration::ZERO;
    config
}

// ---------------------------------------------------------------------------
// Full pass
// ---------------------------------------------------------------------------

#[test]
fn test_full_pass_over_fixtures() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    let dev = DevMode::new(dir.path());
    let config = fixture_config();
    let now = dev.simulated_now().expect("capture time fixture");

    let snapshot = dashboard::run_pass(&config, &dev, now);

    // Feed statuses: only the Dst feed is missing
    let unavailable: Vec<FeedId> = snapshot
        .feeds
        .iter()
        .filter(|f| !f.available)
        .map(|f| f.feed)
        .collect();
    assert_eq!(unavailable, vec![FeedId::Dst]);
    assert!(snapshot.dst.is_empty());

    // Solar wind: latest plasma row, latest mag row
    let sw = snapshot.solar_wind.as_ref().expect("solar wind snapshot");
    assert_eq!(sw.speed, Some(640.0));
    assert_eq!(sw.bz, Some(-7.5));
    assert!(!snapshot.solar_wind_stale);

    // History joins positionally over the shorter (7-row) mag table
    let history = snapshot.solar_wind_history.series().expect("assembled history");
    assert_eq!(history.len(), 7);
    let bz = &history.channel("bz").unwrap().values;
    assert_eq!(bz.iter().filter(|v| v.is_none()).count(), 1);
    assert!(history.timestamps.windows(2).all(|w| w[0] <= w[1]));

    // Kp 7 (3) + speed 640 (2) + Bz -7.5 (3) + G4 (2)
    assert_eq!(snapshot.conditions.score, 10);
    assert_eq!(snapshot.conditions.category, ConditionCategory::Excellent);
    assert_eq!(snapshot.kp.map(|k| k.kp), Some(7.0));

    // Substorm: the primary trace jumped and stayed up
    assert_eq!(snapshot.substorm.primary.status, SubstormStatus::Active);
    assert_eq!(snapshot.substorm.secondary.status, SubstormStatus::Inactive);
    assert!(snapshot.substorm.overall.is_active());

    // Field: complete raster of the configured dimensions
    let raster = &snapshot.aurora_field.raster;
    assert_eq!(raster.width(), config.field.lon_nodes);
    assert_eq!(raster.height(), config.field.lat_nodes);
    assert_eq!(raster.cells.len(), config.field.lon_nodes * config.field.lat_nodes);
    assert!(raster.unmasked_count() > 0);
    assert!(raster.cells.iter().flatten().all(|v| *v > 6.0 && *v <= 100.0));
    assert_eq!(snapshot.aurora_field.observation_time.as_deref(), Some("2024-05-10T19:55:00Z"));

    // Kp outlook: tomorrow carries the 7.67 forecast
    assert_eq!(snapshot.kp_outlook.len(), 3);
    assert_eq!(snapshot.kp_outlook[1].max_kp, 7.7);
    assert_eq!(snapshot.kp_outlook[1].g_scale, 4);

    // Hemispheric power: current value is the newest point
    let power = snapshot.hemi_power.as_ref().expect("hemi power summary");
    assert_eq!(power.current_gw, 85.0);
    assert_eq!(power.points.len(), 12);
}

#[test]
fn test_pass_with_every_feed_missing() {
    let dir = tempfile::tempdir().unwrap();
    let dev = DevMode::new(dir.path());
    let config = fixture_config();

    let snapshot = dashboard::run_pass(&config, &dev, capture_time());

    assert!(snapshot.feeds.iter().all(|f| !f.available));
    assert!(snapshot.solar_wind.is_none());
    assert_eq!(snapshot.conditions.score, 0);
    assert_eq!(snapshot.conditions.category, ConditionCategory::Poor);
    assert!(snapshot.aurora_field.raster.is_fully_masked());
    assert_eq!(
        snapshot.aurora_field.raster.cells.len(),
        config.field.lon_nodes * config.field.lat_nodes
    );
    assert!(snapshot.hemi_power.is_none());
}

#[test]
fn test_malformed_payload_is_an_unavailable_feed() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    fs::write(dir.path().join("planetary-k-index.json"), "[[\"time_tag\", \"Kp\"],").unwrap();
    let dev = DevMode::new(dir.path());

    let snapshot = dashboard::run_pass(&fixture_config(), &dev, capture_time());

    let kp_status = snapshot
        .feeds
        .iter()
        .find(|f| f.feed == FeedId::KpIndex)
        .unwrap();
    assert!(!kp_status.available);
    assert!(snapshot.kp.is_none());
    assert_eq!(snapshot.likelihood, "Unknown");
    // speed (2) + Bz (3) + G4 (2)
    assert_eq!(snapshot.conditions.score, 7);
}

// ---------------------------------------------------------------------------
// Verification over fixtures
// ---------------------------------------------------------------------------

#[test]
fn test_verification_over_fixtures() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    let dev = DevMode::new(dir.path());

    let report = verify::run_full_verification(&fixture_config(), &dev, capture_time());

    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.working, report.summary.total - 1);
    let dst = report.results.iter().find(|r| r.feed == FeedId::Dst).unwrap();
    assert_eq!(dst.status, VerificationStatus::Failed);
}
