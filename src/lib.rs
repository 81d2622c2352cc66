pub mod config;
pub mod correlate;
pub mod dashboard;
pub mod fetch;
pub mod filter;
pub mod heat;
pub mod infra;
pub mod models;
pub mod output;
pub mod poller;
pub mod refresh;
pub mod services;
pub mod viewport;
