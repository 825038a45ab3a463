// proxy module - CORS reverse proxy gateway

pub mod config;
pub mod request;
pub mod response;
pub mod server;
pub mod targets;

pub mod common; // Header allowlists and CORS
pub mod handlers; // Gateway endpoint handlers
pub mod middleware; // Axum middleware
pub mod upstream; // Upstream client

pub use config::ProxyConfig;
pub use server::AxumServer;
pub use targets::TargetAllowlist;
