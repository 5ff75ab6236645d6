//! Aurora and space-weather monitoring service.
//!
//! Pulls the NOAA SWPC real-time products, cleans their sentinel values,
//! and derives the dashboard signals: viewing conditions, a smoothed
//! aurora probability raster, substorm detection, and Kp outlooks.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod dev_mode;
pub mod feeds;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod verify;
