/// Derived signals shown to the viewer.
///
/// - `conditions`: condition score, visibility likelihood, latitude probability
/// - `forecast`: G-scale, 3-day outlook, Kp history, hemispheric power
/// - `stalenesses`: age checks against an injected clock

pub mod conditions;
pub mod forecast;
pub mod stalenesses;
