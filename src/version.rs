// Build-time identity from Cargo.toml, logged at startup.

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `name/version`, e.g. `netperf/0.1.0`.
pub fn banner() -> String {
    format!("{NAME}/{VERSION}")
}
