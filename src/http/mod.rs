//! HTTP client module
//!
//! Provides the HTTP client used to probe the gateway.

mod client;

pub use client::HttpClient;
