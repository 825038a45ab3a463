// Common tools
pub mod headers;
