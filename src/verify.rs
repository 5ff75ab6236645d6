//! Feed Verification Module
//!
//! Checks every configured SWPC feed against its endpoint and reports which
//! ones are reachable and actually carrying usable records. A feed can
//! answer 200 with an empty array or only sentinel rows; that shows up here
//! as a partial success instead of a silent gap on the dashboard.
//!
//! Run this after changing feed URLs or when a product looks frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FeedConfig, ServiceConfig};
use crate::feeds::{self, FeedId};
use crate::ingest::fetch::{FetchOutcome, RawPayload, ResilientFetcher, Transport};
use crate::ingest::swpc::{self, FeedTable, Hemisphere};
use crate::logging;
use crate::model::FeedError;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<FeedVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    /// Reachable and carrying at least one usable record.
    pub working: usize,
    /// Reachable but nothing usable in the payload.
    pub empty: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedVerification {
    pub feed: FeedId,
    pub description: String,
    pub url: String,
    pub status: VerificationStatus,
    pub record_count: usize,
    pub attempts: Option<u32>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Record counting
// ============================================================================

fn table_records(payload: &RawPayload) -> usize {
    payload
        .as_json()
        .and_then(FeedTable::from_json)
        .map_or(0, |t| t.rows.iter().filter(|r| swpc::row_time(r).is_some()).count())
}

/// Records in a payload that the dashboard would actually use.
pub fn usable_records(feed: &FeedConfig, payload: &RawPayload, hemisphere: Hemisphere) -> usize {
    let json = payload.as_json();
    match feed.id {
        FeedId::Plasma5m | FeedId::Mag5m | FeedId::Plasma2h | FeedId::Mag2h | FeedId::KpIndex => {
            table_records(payload)
        }
        FeedId::NoaaScales => json.and_then(swpc::parse_noaa_scales).map_or(0, |_| 1),
        FeedId::Ovation => json
            .and_then(|v| swpc::parse_ovation(v, hemisphere))
            .map_or(0, |grid| grid.samples.len()),
        FeedId::HemiPower => payload.as_text().map_or(0, |t| swpc::parse_hemi_power(t).len()),
        FeedId::GoesMagPrimary | FeedId::GoesMagSecondary => {
            json.map_or(0, |v| swpc::parse_goes_trace(v, feed.satellite, usize::MAX).len())
        }
        FeedId::KpForecast => json.map_or(0, |v| swpc::parse_kp_forecast(v).len()),
        FeedId::Dst => json.map_or(0, |v| swpc::parse_dst(v).len()),
    }
}

// ============================================================================
// Single feed
// ============================================================================

pub fn verify_feed<T: Transport + ?Sized>(
    fetcher: &ResilientFetcher<'_, T>,
    feed: &FeedConfig,
    hemisphere: Hemisphere,
) -> FeedVerification {
    let mut result = FeedVerification {
        feed: feed.id,
        description: feeds::find_feed(feed.id)
            .map(|f| f.description.to_string())
            .unwrap_or_default(),
        url: feed.url.clone(),
        status: VerificationStatus::Failed,
        record_count: 0,
        attempts: None,
        error_message: None,
    };

    match fetcher.fetch(feed) {
        FetchOutcome::Payload(payload) => {
            result.record_count = usable_records(feed, &payload, hemisphere);
            if result.record_count > 0 {
                result.status = VerificationStatus::Success;
            } else {
                let err = FeedError::NoDataAvailable(feed.name.clone());
                logging::log_fetch_failure(
                    &feed.name,
                    &format!("verification ({} raw rows)", payload.row_count()),
                    &err,
                );
                result.status = VerificationStatus::PartialSuccess;
                result.error_message = Some(err.to_string());
            }
        }
        FetchOutcome::Unavailable { last_error, attempts } => {
            result.attempts = Some(attempts);
            result.error_message = Some(last_error.to_string());
        }
    }

    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_full_verification<T: Transport + ?Sized>(
    config: &ServiceConfig,
    transport: &T,
    now: DateTime<Utc>,
) -> VerificationReport {
    let fetcher = ResilientFetcher::new(transport, config.backoff);
    let mut summary = VerificationSummary { total: config.feeds.len(), ..Default::default() };
    let mut results = Vec::with_capacity(config.feeds.len());

    println!("Verifying SWPC feeds...");
    for feed in &config.feeds {
        let result = verify_feed(&fetcher, feed, config.field.hemisphere);

        match result.status {
            VerificationStatus::Success => {
                println!("  {:<20} ✓ OK ({} records)", feed.name, result.record_count);
                summary.working += 1;
            }
            VerificationStatus::PartialSuccess => {
                println!("  {:<20} ⚠ Responsive but no usable records", feed.name);
                println!("  {:<20}   {}", "", result.description);
                summary.empty += 1;
            }
            VerificationStatus::Failed => {
                println!(
                    "  {:<20} ✗ FAILED: {}",
                    feed.name,
                    result.error_message.as_deref().unwrap_or("Unknown")
                );
                println!("  {:<20}   {}", "", result.description);
                summary.failed += 1;
            }
        }

        results.push(result);
    }

    VerificationReport { timestamp: now.to_rfc3339(), results, summary }
}

pub fn print_summary(report: &VerificationReport) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("VERIFICATION SUMMARY ({})", report.timestamp);
    println!("{}", rule);
    println!();
    println!(
        "SWPC feeds:   {}/{} working  ({} empty, {} failed)",
        report.summary.working, report.summary.total, report.summary.empty, report.summary.failed
    );

    let success_rate = if report.summary.total > 0 {
        (report.summary.working as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };
    println!("Overall Success Rate: {:.1}%", success_rate);
    println!("{}", rule);
}
