//! Numerical core: series operations, burn metrics and propulsion formulas.

pub mod metrics;
pub mod physics;
pub mod series;
