/// Database configuration and connection management
pub mod database;

/// SMTP settings from environment variables
pub mod mail;

/// Role and access seed loading from config.toml
pub mod roles;
