//! Configuration module for hdva
//!
//! Layered TOML configuration with environment overrides; see
//! [`HdvaConfig::load`] for the priority order.

mod user_config;

pub use user_config::{HdvaConfig, DEFAULT_MODEL_PATH, EXAMPLE_CONFIG, LOCAL_CONFIG_FILE};
