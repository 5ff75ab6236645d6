//! Telemetry assembly.
//!
//! Joins independently fetched tabular feeds (plasma and magnetic field
//! from the same spacecraft, sharing a cadence) into one `TimeSeries`.
//! The join is positional and best-effort: rows are paired by index over
//! the shortest available input, and a row pair is dropped when any
//! available side has an unparseable timestamp or is not a row at all.
//! A field that merely fails to parse becomes an absent reading.

use crate::ingest::swpc::{self, FeedTable};
use crate::logging::{self, DataSource};
use crate::model::{Assembly, TimeSeries};

/// Where one output channel comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSpec {
    pub name: &'static str,
    /// Index into the `inputs` slice passed to `assemble`.
    pub input: usize,
    /// Column position in tabular rows.
    pub column: usize,
    /// Keys tried in keyed rows.
    pub keys: &'static [&'static str],
}

/// Channels of the 2-hour solar wind history: plasma is input 0, mag is input 1.
pub const SOLAR_WIND_CHANNELS: &[ChannelSpec] = &[
    ChannelSpec { name: "speed", input: 0, column: swpc::PLASMA_SPEED, keys: &["speed"] },
    ChannelSpec { name: "density", input: 0, column: swpc::PLASMA_DENSITY, keys: &["density"] },
    ChannelSpec { name: "bz", input: 1, column: swpc::MAG_BZ, keys: &["bz_gsm", "bz"] },
    ChannelSpec { name: "bt", input: 1, column: swpc::MAG_BT, keys: &["bt"] },
];

/// Assembles `channels` from `inputs`. A `None` input is an unavailable
/// feed: it does not shorten the join and its channels are all absent.
/// Returns `Assembly::NoData` when no input is available or no row survives.
pub fn assemble(inputs: &[Option<&FeedTable>], channels: &[ChannelSpec]) -> Assembly {
    let available: Vec<&FeedTable> = inputs.iter().flatten().copied().collect();
    let Some(rows) = available.iter().map(|t| t.len()).min() else {
        return Assembly::NoData;
    };

    let names: Vec<&str> = channels.iter().map(|c| c.name).collect();
    let mut series = TimeSeries::with_channels(&names);
    let mut skipped = 0usize;

    for i in 0..rows {
        let Some(at) = row_timestamp(&available, i) else {
            skipped += 1;
            continue;
        };
        let values: Vec<Option<f64>> = channels
            .iter()
            .map(|c| {
                inputs
                    .get(c.input)
                    .copied()
                    .flatten()
                    .and_then(|t| swpc::cell_f64(&t.rows[i], c.column, c.keys))
            })
            .collect();
        if !series.push_row(at, &values) {
            skipped += 1;
        }
    }

    if skipped > 0 {
        logging::debug(
            DataSource::Pipeline,
            None,
            &format!("assembly skipped {} of {} rows", skipped, rows),
        );
    }

    if series.is_empty() {
        Assembly::NoData
    } else {
        Assembly::Series(series)
    }
}

/// Timestamp of row `i`, taken from the first input. Every other input must
/// also have a structurally valid row with a parseable timestamp there.
fn row_timestamp(available: &[&FeedTable], i: usize) -> Option<chrono::DateTime<chrono::Utc>> {
    let mut first = None;
    for table in available {
        let row = &table.rows[i];
        if !(row.is_array() || row.is_object()) {
            return None;
        }
        let at = swpc::row_time(row)?;
        first.get_or_insert(at);
    }
    first
}

/// The plasma/mag history join used by the dashboard.
pub fn solar_wind_history(plasma: Option<&FeedTable>, mag: Option<&FeedTable>) -> Assembly {
    assemble(&[plasma, mag], SOLAR_WIND_CHANNELS)
}
