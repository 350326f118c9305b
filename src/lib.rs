pub mod app_state;
pub mod auth;
pub mod cache_mgr;
pub mod config;
pub mod error;
pub mod http;
pub mod indexer;
pub mod metadata;
pub mod probe;
pub mod protocol_client;
pub mod store;
pub mod streamer;
pub mod tracing_setup;
pub mod transcoder;
pub mod utils;
pub mod watch;
