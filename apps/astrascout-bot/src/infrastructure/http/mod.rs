//! HTTP adapters for the upstream feeds.

mod upstream_client;

pub use upstream_client::HttpUpstreamClient;
