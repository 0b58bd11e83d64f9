//! adjutant library — the message routing and orchestration pipeline.

pub mod bus;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod providers;
pub mod reminders;
pub mod routing;
pub mod session;
pub mod telemetry;
pub mod utils;
