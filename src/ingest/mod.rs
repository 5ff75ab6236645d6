/// Upstream data ingestion.
///
/// - `fetch` retrieves raw payloads with bounded retries.
/// - `sentinel` turns provider placeholder values into absent readings.
/// - `swpc` parses the individual SWPC products into typed values.

pub mod fetch;
pub mod sentinel;
pub mod swpc;
