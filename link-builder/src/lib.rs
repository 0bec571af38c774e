pub mod api;
pub mod config;
pub mod links;
pub mod metrics_utils;
pub mod router;
pub mod server;
pub mod source;
pub mod state;
pub mod stats;
