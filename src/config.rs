//! Service configuration.
//!
//! Settings come from a TOML file (`auromon.toml` in the working directory,
//! or the path in `AUROMON_CONFIG`). Every section is optional; anything
//! omitted falls back to the defaults below, which reproduce the dashboard's
//! tuned behaviour. `.env` files are loaded first so the environment
//! variables can live there.
//!
//! ```toml
//! [fetch]
//! timeout_secs = 10
//! max_retries = 3
//! backoff_ms = 1000
//!
//! [[feeds]]
//! id = "plasma-5-minute"   # any feed name from the registry
//! url = "http://localhost:8080/plasma.json"
//!
//! [field]
//! threshold = 5.0
//! hemisphere = "north"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::analysis::field::{
    DEFAULT_LAT_NODES, DEFAULT_LON_NODES, DEFAULT_SMOOTHING_SIGMAS, DEFAULT_THRESHOLD,
    SEAM_WRAP_MARGIN_DEG,
};
use crate::analysis::substorm::{
    EXPECTED_CADENCE_SECS, PERSISTENCE_FRACTION, RECENT_POINTS, SPIKE_THRESHOLD_NT,
    WINDOW_POINTS,
};
use crate::feeds::{FEED_REGISTRY, FeedId, PayloadKind};
use crate::ingest::swpc::Hemisphere;

pub const DEFAULT_CONFIG_PATH: &str = "./auromon.toml";
pub const CONFIG_PATH_ENV: &str = "AUROMON_CONFIG";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "Cannot read config {}: {}", path, source),
            ConfigError::Parse(e) => write!(f, "Invalid config TOML: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// File sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    /// Total attempts per feed, including the first.
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self { timeout_secs: 10, max_retries: 3, backoff_ms: 1000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedOverride {
    pub id: FeedId,
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Samples below this probability are dropped; the output is re-masked
    /// at or below `threshold + 1`.
    pub threshold: f64,
    pub wrap_margin_deg: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub lon_nodes: usize,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lat_nodes: usize,
    pub smoothing_sigmas: Vec<f64>,
    pub hemisphere: Hemisphere,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            wrap_margin_deg: SEAM_WRAP_MARGIN_DEG,
            lon_min: -180.0,
            lon_max: 180.0,
            lon_nodes: DEFAULT_LON_NODES,
            lat_min: 35.0,
            lat_max: 85.0,
            lat_nodes: DEFAULT_LAT_NODES,
            smoothing_sigmas: DEFAULT_SMOOTHING_SIGMAS.to_vec(),
            hemisphere: Hemisphere::North,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SubstormConfig {
    pub window_points: usize,
    pub recent_points: usize,
    pub spike_threshold_nt: f64,
    pub persistence_fraction: f64,
    pub cadence_secs: i64,
    /// Most recent points kept per satellite trace.
    pub history_points: usize,
}

impl Default for SubstormConfig {
    fn default() -> Self {
        Self {
            window_points: WINDOW_POINTS,
            recent_points: RECENT_POINTS,
            spike_threshold_nt: SPIKE_THRESHOLD_NT,
            persistence_fraction: PERSISTENCE_FRACTION,
            cadence_secs: EXPECTED_CADENCE_SECS,
            history_points: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None, timestamps: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    pub max_age_minutes: u64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self { max_age_minutes: 30 }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    fetch: FetchSettings,
    feeds: Vec<FeedOverride>,
    field: FieldConfig,
    substorm: SubstormConfig,
    logging: LoggingConfig,
    staleness: StalenessConfig,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// One fetchable endpoint with its retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub id: FeedId,
    pub name: String,
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub kind: PayloadKind,
    pub satellite: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub feeds: Vec<FeedConfig>,
    /// Fixed pause between attempts on the same feed.
    pub backoff: Duration,
    pub field: FieldConfig,
    pub substorm: SubstormConfig,
    pub logging: LoggingConfig,
    pub staleness: StalenessConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl ServiceConfig {
    fn from_file(file: ConfigFile) -> Self {
        let feeds = FEED_REGISTRY
            .iter()
            .map(|feed| {
                let over = file.feeds.iter().rev().find(|o| o.id == feed.id);
                FeedConfig {
                    id: feed.id,
                    name: feed.name.to_string(),
                    url: over
                        .and_then(|o| o.url.clone())
                        .unwrap_or_else(|| feed.default_url.to_string()),
                    timeout: Duration::from_secs(
                        over.and_then(|o| o.timeout_secs).unwrap_or(file.fetch.timeout_secs),
                    ),
                    max_retries: over
                        .and_then(|o| o.max_retries)
                        .unwrap_or(file.fetch.max_retries),
                    kind: feed.kind,
                    satellite: feed.satellite,
                }
            })
            .collect();

        Self {
            feeds,
            backoff: Duration::from_millis(file.fetch.backoff_ms),
            field: file.field,
            substorm: file.substorm,
            logging: file.logging,
            staleness: file.staleness,
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let config = Self::from_file(file);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `.env`, then the file named by `AUROMON_CONFIG`. Without the
    /// variable, `./auromon.toml` is used if present, else the defaults.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(Path::new(&path)),
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn feed(&self, id: FeedId) -> Option<&FeedConfig> {
        self.feeds.iter().find(|f| f.id == id)
    }

    /// Points every feed at `base_url/<feed-name>`; used to aim the whole
    /// service at a mirror or a local fixture server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        for feed in &mut self.feeds {
            feed.url = format!("{}/{}", base, feed.name);
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for feed in &self.feeds {
            if feed.max_retries == 0 {
                return Err(ConfigError::Invalid(format!(
                    "feed '{}': max_retries must be at least 1",
                    feed.name
                )));
            }
        }
        let f = &self.field;
        if f.lon_nodes < 2 || f.lat_nodes < 2 {
            return Err(ConfigError::Invalid("field grid needs at least 2 nodes per axis".into()));
        }
        if f.lon_min >= f.lon_max || f.lat_min >= f.lat_max {
            return Err(ConfigError::Invalid("field window bounds are inverted".into()));
        }
        if f.smoothing_sigmas.iter().any(|s| s.is_nan() || *s <= 0.0) {
            return Err(ConfigError::Invalid("smoothing sigmas must be positive".into()));
        }
        let s = &self.substorm;
        if s.recent_points == 0 || s.recent_points > s.window_points {
            return Err(ConfigError::Invalid(
                "substorm recent_points must be within 1..=window_points".into(),
            ));
        }
        if s.history_points < s.window_points {
            return Err(ConfigError::Invalid(
                "substorm history_points must cover the detection window".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_cover_every_registered_feed() {
        let config = ServiceConfig::default();
        assert_eq!(config.feeds.len(), FEED_REGISTRY.len());
        let ovation = config.feed(FeedId::Ovation).expect("ovation configured");
        assert_eq!(ovation.timeout, Duration::from_secs(10));
        assert_eq!(ovation.max_retries, 3);
        assert_eq!(config.backoff, Duration::from_millis(1000));
    }

    #[test]
    fn test_empty_document_is_the_default_config() {
        let config = ServiceConfig::from_toml_str("").expect("empty toml is valid");
        assert_eq!(config.field, FieldConfig::default());
        assert_eq!(config.substorm, SubstormConfig::default());
    }

    #[test]
    fn test_feed_override_replaces_only_that_feed() {
        let text = r#"
            [fetch]
            timeout_secs = 5
            max_retries = 2

            [[feeds]]
            id = "planetary-k-index"
            url = "http://localhost:9000/kp.json"
            max_retries = 4
        "#;
        let config = ServiceConfig::from_toml_str(text).expect("valid config");
        let kp = config.feed(FeedId::KpIndex).unwrap();
        assert_eq!(kp.url, "http://localhost:9000/kp.json");
        assert_eq!(kp.max_retries, 4);
        assert_eq!(kp.timeout, Duration::from_secs(5));

        let dst = config.feed(FeedId::Dst).unwrap();
        assert!(dst.url.starts_with("https://services.swpc.noaa.gov/"));
        assert_eq!(dst.max_retries, 2);
    }

    #[test]
    fn test_zero_retries_is_rejected() {
        let result = ServiceConfig::from_toml_str("[fetch]\nmax_retries = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let result = ServiceConfig::from_toml_str("[field]\nlat_min = 80.0\nlat_max = 40.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_feed_id_is_a_parse_error() {
        let result = ServiceConfig::from_toml_str("[[feeds]]\nid = \"sunspots\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_southern_field_config() {
        let text = "[field]\nhemisphere = \"south\"\nlat_min = -85.0\nlat_max = -35.0\n";
        let config = ServiceConfig::from_toml_str(text).expect("valid config");
        assert_eq!(config.field.hemisphere, Hemisphere::South);
        assert_eq!(config.field.lat_min, -85.0);
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[staleness]\nmax_age_minutes = 45").unwrap();
        let config = ServiceConfig::load(file.path()).expect("loads");
        assert_eq!(config.staleness.max_age_minutes, 45);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = ServiceConfig::load(Path::new("/nonexistent/auromon.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/auromon.toml"));
    }

    #[test]
    fn test_with_base_url_uses_feed_names() {
        let config = ServiceConfig::default().with_base_url("http://127.0.0.1:8000/");
        let mag = config.feed(FeedId::Mag2h).unwrap();
        assert_eq!(mag.url, "http://127.0.0.1:8000/mag-2-hour");
    }
}
