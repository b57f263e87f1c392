//! SUI / MIST conversions

/// MIST per SUI
pub const MIST_PER_SUI: u64 = 1_000_000_000;

/// Whole MIST for a SUI amount, rounded down. Negative input gives 0.
pub fn sui_to_mist(sui: f64) -> u64 {
    (sui * MIST_PER_SUI as f64).floor().max(0.0) as u64
}

pub fn mist_to_sui(mist: u64) -> f64 {
    mist as f64 / MIST_PER_SUI as f64
}

/// `"1.2500 SUI"`
pub fn format_sui(mist: u64) -> String {
    format!("{:.4} SUI", mist_to_sui(mist))
}
