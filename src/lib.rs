//! Telemetry reduction for rocket static-fire and cold-flow tests.
//!
//! A loaded [`data::model::ColumnTable`] is bound to column roles, windowed
//! by thrust threshold or time range, and reduced to burn metrics, mass flow,
//! CdA, set pressure, ISP, exhaust velocity, c* and venturi flow. The
//! [`controller::Analyzer`] drives a [`session::Session`] and reports through
//! the [`presentation::Presentation`] trait.

pub mod analysis;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod presentation;
pub mod session;
