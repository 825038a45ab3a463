// Middleware module - Axum middleware

pub mod logging;

pub use logging::request_span_middleware;
