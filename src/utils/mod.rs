//! Configuration utilities.

/// TOML file plus environment overrides.
pub mod toml_config;
