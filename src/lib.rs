pub mod config;
pub mod error;
pub mod http;
pub mod layout;
pub mod localize;
pub mod metrics;
pub mod orchestrator;
pub mod reconcile;
pub mod serve;
pub mod telemetry;
pub mod utils;
