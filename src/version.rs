// Build-time identity from Cargo.toml

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// User-Agent sent to the metrics backend, e.g. "cloudboard/0.3.0".
pub fn user_agent() -> String {
    format!("{}/{}", NAME, VERSION)
}
