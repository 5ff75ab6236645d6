/// One dashboard refresh: fetch every feed, derive every product.
///
/// A pass owns everything it computes. Feeds are fetched concurrently,
/// one scoped thread each, and a failed feed only blanks the outputs that
/// depend on it. The field build, the slowest step, runs on its own thread
/// alongside the scalar signals.

use std::collections::HashMap;
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::alert::conditions::{self, LatitudeProbability};
use crate::alert::forecast::{self, DailyOutlook, HemiPowerSummary, KpHistoryPoint};
use crate::alert::stalenesses;
use crate::analysis::{assemble, field, substorm};
use crate::config::{FieldConfig, ServiceConfig};
use crate::feeds::FeedId;
use crate::ingest::fetch::{FetchOutcome, ResilientFetcher, Transport};
use crate::ingest::swpc::{self, DstPoint, FeedTable, KpReading, NoaaScales, SolarWind};
use crate::logging::{self, DataSource};
use crate::model::{Assembly, ConditionScore, FeedError, Raster, SubstormState, TimeSeries};

// ---------------------------------------------------------------------------
// Fetch stage
// ---------------------------------------------------------------------------

/// Outcomes of one fetch pass, keyed by feed.
pub struct FetchedFeeds {
    outcomes: HashMap<FeedId, FetchOutcome>,
}

impl FetchedFeeds {
    pub fn from_outcomes(outcomes: HashMap<FeedId, FetchOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcome(&self, id: FeedId) -> Option<&FetchOutcome> {
        self.outcomes.get(&id)
    }

    pub fn json(&self, id: FeedId) -> Option<&Value> {
        self.outcome(id).and_then(FetchOutcome::json)
    }

    pub fn text(&self, id: FeedId) -> Option<&str> {
        self.outcome(id).and_then(FetchOutcome::text)
    }

    pub fn table(&self, id: FeedId) -> Option<FeedTable> {
        self.json(id).and_then(FeedTable::from_json)
    }

    pub fn available_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_available()).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Fetches every configured feed concurrently. Never fails: unreachable
/// feeds come back as `FetchOutcome::Unavailable`.
pub fn fetch_all<T: Transport + ?Sized>(config: &ServiceConfig, transport: &T) -> FetchedFeeds {
    let fetcher = ResilientFetcher::new(transport, config.backoff);
    let fetcher = &fetcher;

    let outcomes: HashMap<FeedId, FetchOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = config
            .feeds
            .iter()
            .map(|feed| (feed, scope.spawn(move || fetcher.fetch(feed))))
            .collect();

        handles
            .into_iter()
            .map(|(feed, handle)| {
                let outcome = handle.join().unwrap_or_else(|_| FetchOutcome::Unavailable {
                    last_error: FeedError::Transport("fetch thread panicked".into()),
                    attempts: 0,
                });
                (feed.id, outcome)
            })
            .collect()
    });

    let fetched = FetchedFeeds::from_outcomes(outcomes);
    let available = fetched.available_count();
    logging::log_pass_summary(fetched.len(), available, fetched.len() - available);
    fetched
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FeedStatus {
    pub feed: FeedId,
    pub available: bool,
    pub attempts: Option<u32>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubstormReport {
    pub primary: SubstormState,
    pub secondary: SubstormState,
    pub overall: SubstormState,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuroraField {
    pub observation_time: Option<String>,
    pub forecast_time: Option<String>,
    pub sample_count: usize,
    pub raster: Raster,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub feeds: Vec<FeedStatus>,
    pub solar_wind: Option<SolarWind>,
    pub solar_wind_stale: bool,
    pub solar_wind_history: Assembly,
    pub kp: Option<KpReading>,
    pub scales: Option<NoaaScales>,
    pub conditions: ConditionScore,
    pub likelihood: &'static str,
    pub substorm: SubstormReport,
    pub aurora_field: AuroraField,
    pub hemi_power: Option<HemiPowerSummary>,
    pub kp_outlook: Vec<DailyOutlook>,
    pub kp_history: Vec<KpHistoryPoint>,
    pub dst: Vec<DstPoint>,
}

/// Runs one complete pass against `transport`.
pub fn run_pass<T: Transport + ?Sized>(
    config: &ServiceConfig,
    transport: &T,
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    let fetched = fetch_all(config, transport);
    build_snapshot(config, &fetched, now)
}

/// Derives every product from already-fetched feeds.
pub fn build_snapshot(config: &ServiceConfig, fetched: &FetchedFeeds, now: DateTime<Utc>) -> DashboardSnapshot {
    thread::scope(|scope| {
        let field_job = scope.spawn(|| build_aurora_field(fetched, &config.field));

        let solar_wind = latest_solar_wind(fetched);
        let solar_wind_stale = solar_wind
            .as_ref()
            .and_then(SolarWind::observed_at)
            .map_or(true, |at| stalenesses::is_stale_at(at, config.staleness.max_age_minutes, now));
        let solar_wind_history = history(fetched, solar_wind.as_ref());

        let kp = fetched.json(FeedId::KpIndex).and_then(swpc::parse_latest_kp);
        let scales = fetched.json(FeedId::NoaaScales).and_then(swpc::parse_noaa_scales);
        let kp_value = kp.map(|k| k.kp);
        let score = conditions::condition_score(
            kp_value,
            solar_wind.as_ref().and_then(|s| s.speed),
            solar_wind.as_ref().and_then(|s| s.bz),
            scales.as_ref().and_then(|s| s.g_scale),
        );

        let forecast_rows = fetched.json(FeedId::KpForecast).map(swpc::parse_kp_forecast).unwrap_or_default();
        let hemi_power = fetched
            .text(FeedId::HemiPower)
            .map(swpc::parse_hemi_power)
            .and_then(|points| forecast::summarize_hemi_power(&points, now));

        let aurora_field = field_job.join().unwrap_or_else(|_| {
            logging::error(DataSource::Field, None, "field build panicked, serving masked raster");
            AuroraField {
                observation_time: None,
                forecast_time: None,
                sample_count: 0,
                raster: field::masked_field(&config.field),
            }
        });

        DashboardSnapshot {
            generated_at: now,
            feeds: feed_statuses(config, fetched),
            solar_wind,
            solar_wind_stale,
            solar_wind_history,
            kp,
            scales,
            conditions: score,
            likelihood: conditions::aurora_likelihood(kp_value),
            substorm: substorm_report(fetched, config),
            aurora_field,
            hemi_power,
            kp_outlook: forecast::three_day_outlook(&forecast_rows, now),
            kp_history: forecast::kp_history(&forecast_rows, now),
            dst: fetched.json(FeedId::Dst).map(swpc::parse_dst).unwrap_or_default(),
        }
    })
}

/// Latitude probability for the Kp in `snapshot`.
pub fn probability_for(snapshot: &DashboardSnapshot, latitude: f64) -> LatitudeProbability {
    conditions::probability_at_latitude(latitude, snapshot.kp.map(|k| k.kp))
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn feed_statuses(config: &ServiceConfig, fetched: &FetchedFeeds) -> Vec<FeedStatus> {
    config
        .feeds
        .iter()
        .map(|feed| match fetched.outcome(feed.id) {
            Some(FetchOutcome::Payload(_)) => {
                FeedStatus { feed: feed.id, available: true, attempts: None, error: None }
            }
            Some(FetchOutcome::Unavailable { last_error, attempts }) => FeedStatus {
                feed: feed.id,
                available: false,
                attempts: Some(*attempts),
                error: Some(last_error.to_string()),
            },
            None => FeedStatus { feed: feed.id, available: false, attempts: None, error: None },
        })
        .collect()
}

/// Latest values from the 5-minute products, falling back to the 2-hour
/// products when neither 5-minute product answered.
fn latest_solar_wind(fetched: &FetchedFeeds) -> Option<SolarWind> {
    let plasma = fetched.table(FeedId::Plasma5m);
    let mag = fetched.table(FeedId::Mag5m);
    swpc::latest_solar_wind(plasma.as_ref(), mag.as_ref()).or_else(|| {
        let plasma = fetched.table(FeedId::Plasma2h);
        let mag = fetched.table(FeedId::Mag2h);
        swpc::latest_solar_wind(plasma.as_ref(), mag.as_ref())
    })
}

/// Two-hour history; when nothing survives assembly, the latest snapshot
/// stands in as a single row.
fn history(fetched: &FetchedFeeds, latest: Option<&SolarWind>) -> Assembly {
    let plasma = fetched.table(FeedId::Plasma2h);
    let mag = fetched.table(FeedId::Mag2h);
    let assembled = assemble::solar_wind_history(plasma.as_ref(), mag.as_ref());
    if assembled != Assembly::NoData {
        return assembled;
    }

    let Some((sw, at)) = latest.and_then(|sw| sw.observed_at().map(|at| (sw, at))) else {
        return Assembly::NoData;
    };
    let names: Vec<&str> = assemble::SOLAR_WIND_CHANNELS.iter().map(|c| c.name).collect();
    let mut series = TimeSeries::with_channels(&names);
    series.push_row(at, &[sw.speed, sw.density, sw.bz, sw.bt]);
    logging::warn(DataSource::Pipeline, None, "2-hour history unavailable, using latest snapshot");
    Assembly::Series(series)
}

fn substorm_report(fetched: &FetchedFeeds, config: &ServiceConfig) -> SubstormReport {
    let tuning = &config.substorm;
    let state_for = |id: FeedId| -> SubstormState {
        let satellite = config.feed(id).and_then(|f| f.satellite);
        match fetched.json(id) {
            Some(payload) => {
                let trace = swpc::parse_goes_trace(payload, satellite, tuning.history_points);
                substorm::detect_trace(&trace, tuning)
            }
            None => SubstormState::insufficient(),
        }
    };
    let primary = state_for(FeedId::GoesMagPrimary);
    let secondary = state_for(FeedId::GoesMagSecondary);
    SubstormReport { primary, secondary, overall: substorm::combine(&[primary, secondary]) }
}

fn build_aurora_field(fetched: &FetchedFeeds, field_config: &FieldConfig) -> AuroraField {
    let grid = fetched
        .json(FeedId::Ovation)
        .and_then(|payload| swpc::parse_ovation(payload, field_config.hemisphere));

    match grid {
        Some(grid) => AuroraField {
            raster: field::build_field(&grid.samples, field_config),
            sample_count: grid.samples.len(),
            observation_time: grid.observation_time,
            forecast_time: grid.forecast_time,
        },
        None => {
            logging::warn(DataSource::Field, Some("ovation-aurora"), "no OVATION grid, field fully masked");
            AuroraField {
                observation_time: None,
                forecast_time: None,
                sample_count: 0,
                raster: field::masked_field(field_config),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConditionCategory;
    use serde_json::json;
    use std::time::Duration;

    /// Serves bodies by the last URL segment; anything else is a 503.
    struct MapTransport(HashMap<&'static str, String>);

    impl Transport for MapTransport {
        fn get(&self, url: &str, _timeout: Duration) -> Result<String, FeedError> {
            let name = url.rsplit('/').next().unwrap_or(url);
            self.0.get(name).cloned().ok_or(FeedError::Http(503))
        }
    }

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::default().with_base_url("fixture://test");
        config.backoff = Duration::ZERO;
        config.field.lon_nodes = 37;
        config.field.lat_nodes = 11;
        config
    }

    fn now() -> DateTime<Utc> {
        "2024-05-10T18:10:00Z".parse().unwrap()
    }

    #[test]
    fn test_every_feed_down_still_produces_a_snapshot() {
        let transport = MapTransport(HashMap::new());
        let snapshot = run_pass(&config(), &transport, now());

        assert!(snapshot.feeds.iter().all(|f| !f.available));
        assert!(snapshot.feeds.iter().all(|f| f.attempts == Some(3)));
        assert_eq!(snapshot.conditions.category, ConditionCategory::Poor);
        assert_eq!(snapshot.likelihood, "Unknown");
        assert!(snapshot.solar_wind_stale);
        assert_eq!(snapshot.solar_wind_history, Assembly::NoData);
        assert!(snapshot.aurora_field.raster.is_fully_masked());
        assert_eq!(snapshot.aurora_field.raster.cells.len(), 37 * 11);
        assert!(!snapshot.substorm.overall.is_active());
        assert_eq!(snapshot.kp_outlook.len(), 3);
    }

    #[test]
    fn test_partial_feeds_drive_conditions() {
        let mut bodies = HashMap::new();
        bodies.insert(
            "plasma-5-minute",
            json!([
                ["time_tag", "density", "speed", "temperature"],
                ["2024-05-10 18:05:00.000", "6.0", "650.0", "120000"]
            ])
            .to_string(),
        );
        bodies.insert(
            "mag-5-minute",
            json!([
                ["time_tag", "bx_gsm", "by_gsm", "bz_gsm", "lon_gsm", "lat_gsm", "bt"],
                ["2024-05-10 18:05:00.000", "1", "2", "-6.0", "0", "0", "9"]
            ])
            .to_string(),
        );
        bodies.insert(
            "planetary-k-index",
            json!([["time_tag", "Kp"], ["2024-05-10 15:00:00.000", "7.00"]]).to_string(),
        );

        let snapshot = run_pass(&config(), &MapTransport(bodies), now());

        // Kp 3 + speed 2 + Bz 3, scales unavailable
        assert_eq!(snapshot.conditions.score, 8);
        assert_eq!(snapshot.conditions.category, ConditionCategory::Excellent);
        assert_eq!(snapshot.likelihood, "Very High - Visible at mid-latitudes");
        assert!(!snapshot.solar_wind_stale);
        // 2-hour history missing: the latest snapshot stands in
        assert_eq!(snapshot.solar_wind_history.series().map(|s| s.len()), Some(1));
        assert_eq!(probability_for(&snapshot, 52.0).probability, 45);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = run_pass(&config(), &MapTransport(HashMap::new()), now());
        let text = serde_json::to_string(&snapshot).expect("snapshot is serializable");
        assert!(text.contains("\"generated_at\""));
        assert!(text.contains("\"planetary-k-index\""));
    }
}
