pub mod profile;
pub mod report;
pub mod snapshot;

/// Rounds to one decimal place, the precision used for every percentage and score.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
