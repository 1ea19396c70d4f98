//! Configuration module for Colibri
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and loading rule files on top of the configured request defaults.
//!
//! # Example
//!
//! ```no_run
//! use colibri::config::{load_config, load_rules};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("colibri.toml")).unwrap();
//! let rule = load_rules(Path::new("rules.json"), &config.defaults).unwrap();
//! println!("Extracting {} selectors", rule.selectors.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ExtractorConfig, RequestDefaults};

// Re-export parser functions
pub use parser::{load_config, load_rules, parse_config, parse_rules};
pub use validation::validate;
