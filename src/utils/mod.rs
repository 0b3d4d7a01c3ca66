//! Utility modules shared by the solver and its driver

pub mod units;

pub use units::{
    years_to_seconds, seconds_to_years,
    km_to_m, m_to_km,
    m_per_s_to_cm_per_year, pa_to_mpa,
};
