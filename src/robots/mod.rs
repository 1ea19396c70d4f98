//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Requests denied by a host's robots.txt fail with
//! [`Error::RobotsRestriction`](crate::Error::RobotsRestriction).

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use crate::crawler::Colibri;
use crate::rules::Rule;

/// Robots-exclusion gate consulted before each request
pub trait RobotsTxt: Send + Sync {
    /// Verifies that the rule's User-Agent may fetch the rule's URL
    ///
    /// # Arguments
    ///
    /// * `colibri` - Used to fetch robots.txt files that are not cached yet
    /// * `rule` - The outgoing request
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The request may proceed
    /// * `Err(Error::RobotsRestriction)` - The URL is disallowed
    /// * `Err(_)` - robots.txt could not be fetched
    fn is_allowed(&self, colibri: &Colibri, rule: &Rule) -> crate::Result<()>;

    /// Removes stored policies
    fn clear(&self);
}
