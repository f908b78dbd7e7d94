//! desk-pilot service core.

pub mod cli;
pub mod config;
pub mod providers;
pub mod router;
pub mod session;
pub mod telemetry;
