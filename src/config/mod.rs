/// Database configuration and connection management
pub mod database;

/// Seed user configuration from config.toml
pub mod users;
