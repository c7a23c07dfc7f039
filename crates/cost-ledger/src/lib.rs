pub mod config;
pub mod error;
pub mod items;
pub mod telemetry;
