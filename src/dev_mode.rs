/// Development mode: replay recorded SWPC payloads
///
/// When the live feeds are unreachable (offline work, CI, demos), point the
/// service at a directory of captured payloads instead. Each feed is served
/// from `<feed-name>.json` or `<feed-name>.txt` in that directory; a feed
/// with no file behaves like an endpoint returning 404, so partial fixture
/// sets exercise the same degradation paths as a real outage.
///
/// An optional `now.txt` holds the capture time, so time-windowed outputs
/// (hemispheric power window, Kp history) line up with the recorded data.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::feeds::find_feed_by_name;
use crate::ingest::fetch::Transport;
use crate::ingest::swpc::parse_utc_timestamp;
use crate::model::FeedError;

pub const FIXTURES_ENV: &str = "AUROMON_FIXTURES";

/// Base URL the config is pointed at in dev mode; only the last path
/// segment of each URL is used to find the fixture.
pub const FIXTURE_BASE_URL: &str = "fixture://local";

const EXTENSIONS: [&str; 2] = ["json", "txt"];

/// Configuration for fixture replay
pub struct DevMode {
    pub fixture_dir: PathBuf,
}

impl DevMode {
    pub fn new(fixture_dir: impl Into<PathBuf>) -> Self {
        Self { fixture_dir: fixture_dir.into() }
    }

    /// Dev mode from `AUROMON_FIXTURES`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var(FIXTURES_ENV).ok().filter(|v| !v.is_empty()).map(Self::new)
    }

    /// Fixture file for a feed name, if one exists.
    pub fn fixture_path(&self, feed_name: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.fixture_dir.join(format!("{}.{}", feed_name, ext)))
            .find(|p| p.is_file())
    }

    /// Registered feed names that have a fixture, sorted.
    pub fn available_fixtures(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.fixture_dir)? {
            let path = entry?.path();
            let is_fixture = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if !is_fixture {
                continue;
            }
            if let Some(feed) = path.file_stem().and_then(|s| s.to_str()).and_then(find_feed_by_name) {
                names.push(feed.name.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Capture time recorded in `now.txt`, if present and parseable.
    pub fn simulated_now(&self) -> Option<DateTime<Utc>> {
        let text = std::fs::read_to_string(self.fixture_dir.join("now.txt")).ok()?;
        parse_utc_timestamp(text.trim())
    }
}

/// Feed name from the last path segment of a URL, without extension.
fn feed_name_from_url(url: &str) -> &str {
    let segment = url.rsplit('/').next().unwrap_or(url);
    Path::new(segment)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(segment)
}

impl Transport for DevMode {
    fn get(&self, url: &str, _timeout: Duration) -> Result<String, FeedError> {
        let name = feed_name_from_url(url);
        let path = self.fixture_path(name).ok_or(FeedError::Http(404))?;
        std::fs::read_to_string(&path)
            .map_err(|e| FeedError::Transport(format!("{}: {}", path.display(), e)))
    }
}
