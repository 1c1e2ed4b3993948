//! Controller wiring for the multi-tenant broker Trigger reconciler

pub mod config;
pub mod controller_runner;

pub use config::ControllerConfig;
