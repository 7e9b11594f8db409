// Library surface for the binary and the integration tests.
pub mod api;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod paginator;
pub mod pipeline;
pub mod reliability;
pub mod scoring;
pub mod submitter;
pub mod telemetry;
pub mod transport;
pub mod types;
