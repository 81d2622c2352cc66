mod client;

pub use client::AggregationClient;
