/// Feed registry for the aurora monitoring service.
///
/// Defines the canonical list of NOAA SWPC products consumed by the
/// pipeline, along with their default endpoints and payload shapes.
/// Other modules reference feeds from here rather than hardcoding URLs.
/// Runtime endpoints, timeouts and retry counts live in `config::FeedConfig`,
/// which starts from these defaults.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Feed identity
// ---------------------------------------------------------------------------

/// Serialized form matches the registry `name`, so config files and
/// fixture directories use one spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedId {
    #[serde(rename = "plasma-5-minute")]
    Plasma5m,
    #[serde(rename = "mag-5-minute")]
    Mag5m,
    #[serde(rename = "plasma-2-hour")]
    Plasma2h,
    #[serde(rename = "mag-2-hour")]
    Mag2h,
    #[serde(rename = "planetary-k-index")]
    KpIndex,
    #[serde(rename = "noaa-scales")]
    NoaaScales,
    #[serde(rename = "ovation-aurora")]
    Ovation,
    #[serde(rename = "hemi-power")]
    HemiPower,
    #[serde(rename = "goes-mag-primary")]
    GoesMagPrimary,
    #[serde(rename = "goes-mag-secondary")]
    GoesMagSecondary,
    #[serde(rename = "kp-forecast")]
    KpForecast,
    #[serde(rename = "kyoto-dst")]
    Dst,
}

/// How a feed's body must decode for the fetch to count as successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Json,
    Text,
}

/// Static metadata for a single SWPC product.
pub struct Feed {
    pub id: FeedId,
    /// Short stable name, used in logs, config files and fixture file names.
    pub name: &'static str,
    pub description: &'static str,
    pub default_url: &'static str,
    pub kind: PayloadKind,
    /// GOES magnetometer products mix satellites; keep only this one.
    pub satellite: Option<u32>,
}

pub static FEED_REGISTRY: &[Feed] = &[
    Feed {
        id: FeedId::Plasma5m,
        name: "plasma-5-minute",
        description: "Latest solar wind density, speed and temperature (DSCOVR/ACE).",
        default_url: "https://services.swpc.noaa.gov/products/solar-wind/plasma-5-minute.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::Mag5m,
        name: "mag-5-minute",
        description: "Latest interplanetary magnetic field components and total field.",
        default_url: "https://services.swpc.noaa.gov/products/solar-wind/mag-5-minute.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::Plasma2h,
        name: "plasma-2-hour",
        description: "Two hours of solar wind plasma at 1-minute cadence.",
        default_url: "https://services.swpc.noaa.gov/products/solar-wind/plasma-2-hour.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::Mag2h,
        name: "mag-2-hour",
        description: "Two hours of interplanetary magnetic field at 1-minute cadence.",
        default_url: "https://services.swpc.noaa.gov/products/solar-wind/mag-2-hour.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::KpIndex,
        name: "planetary-k-index",
        description: "Observed 3-hourly planetary K-index.",
        default_url: "https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::NoaaScales,
        name: "noaa-scales",
        description: "Current NOAA G/R/S space weather scales.",
        default_url: "https://services.swpc.noaa.gov/products/noaa-scales.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::Ovation,
        name: "ovation-aurora",
        description: "OVATION Prime nowcast: 1-degree grid of aurora probability.",
        default_url: "https://services.swpc.noaa.gov/json/ovation_aurora_latest.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::HemiPower,
        name: "hemi-power",
        description: "Hemispheric power nowcast, whitespace-separated text.",
        default_url: "https://services.swpc.noaa.gov/text/aurora-nowcast-hemi-power.txt",
        kind: PayloadKind::Text,
        satellite: None,
    },
    Feed {
        id: FeedId::GoesMagPrimary,
        name: "goes-mag-primary",
        description: "GOES primary magnetometer, 6 hours at 1-minute cadence.",
        default_url: "https://services.swpc.noaa.gov/json/goes/primary/magnetometers-6-hour.json",
        kind: PayloadKind::Json,
        satellite: Some(19),
    },
    Feed {
        id: FeedId::GoesMagSecondary,
        name: "goes-mag-secondary",
        description: "GOES secondary magnetometer, 6 hours at 1-minute cadence.",
        default_url: "https://services.swpc.noaa.gov/json/goes/secondary/magnetometers-6-hour.json",
        kind: PayloadKind::Json,
        satellite: Some(18),
    },
    Feed {
        id: FeedId::KpForecast,
        name: "kp-forecast",
        description: "Observed, estimated and predicted Kp over roughly a week.",
        default_url: "https://services.swpc.noaa.gov/products/noaa-planetary-k-index-forecast.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
    Feed {
        id: FeedId::Dst,
        name: "kyoto-dst",
        description: "Kyoto Dst index, hourly, nT.",
        default_url: "https://services.swpc.noaa.gov/products/kyoto-dst.json",
        kind: PayloadKind::Json,
        satellite: None,
    },
];

/// Looks up a feed by id. Every `FeedId` has exactly one registry entry.
pub fn find_feed(id: FeedId) -> Option<&'static Feed> {
    FEED_REGISTRY.iter().find(|f| f.id == id)
}

/// Looks up a feed by its short name. Returns `None` if not found.
pub fn find_feed_by_name(name: &str) -> Option<&'static Feed> {
    FEED_REGISTRY.iter().find(|f| f.name == name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
