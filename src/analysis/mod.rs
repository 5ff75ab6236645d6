/// Numerical core: turns parsed feed data into derived products.
///
/// Submodules:
/// - `assemble` joins plasma and magnetic field tables into one time series.
/// - `field` builds the aurora probability raster from OVATION samples.
/// - `triangulation` and `smoothing` are the field builder's numerics.
/// - `substorm` classifies GOES magnetometer traces.

pub mod assemble;
pub mod field;
pub mod smoothing;
pub mod substorm;
pub mod triangulation;
