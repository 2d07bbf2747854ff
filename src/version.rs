// Version information for the exporter

/// Semantic version number
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-agent string sent with every admin-API request
pub const USER_AGENT: &str = concat!("cloudant-exporter/", env!("CARGO_PKG_VERSION"));
