//! Version information for the kitchenhub CLI.

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Line printed by `--version`.
pub fn version_line() -> String {
    format!("kitchenhub {}", VERSION)
}
