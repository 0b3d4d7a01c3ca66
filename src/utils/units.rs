//! Unit conversion helpers for post-seismic simulations
//!
//! Configuration files speak in years, kilometres and centimetres per year;
//! the solver works in SI units throughout.

// ============================================================================
// Time Conversions
// ============================================================================

/// Seconds per year (365.25 days accounting for leap years)
pub const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Convert years to seconds
///
/// # Examples
/// ```
/// use postseismic::utils::units::years_to_seconds;
/// let dt_sec = years_to_seconds(0.5); // half a year
/// ```
#[inline]
pub fn years_to_seconds(years: f64) -> f64 {
    years * SECONDS_PER_YEAR
}

/// Convert seconds to years
#[inline]
pub fn seconds_to_years(seconds: f64) -> f64 {
    seconds / SECONDS_PER_YEAR
}

// ============================================================================
// Length and Velocity Conversions
// ============================================================================

pub const KM_TO_M: f64 = 1e3;
pub const M_TO_KM: f64 = 1e-3;

#[inline]
pub fn km_to_m(km: f64) -> f64 {
    km * KM_TO_M
}

#[inline]
pub fn m_to_km(m: f64) -> f64 {
    m * M_TO_KM
}

/// Convert m/s to cm/yr (typical geodetic velocity unit)
#[inline]
pub fn m_per_s_to_cm_per_year(m_per_s: f64) -> f64 {
    m_per_s * 1e2 * SECONDS_PER_YEAR
}

// ============================================================================
// Stress Conversions
// ============================================================================

pub const PA_TO_MPA: f64 = 1e-6;

#[inline]
pub fn pa_to_mpa(pa: f64) -> f64 {
    pa * PA_TO_MPA
}
