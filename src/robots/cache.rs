//! Robots.txt caching implementation
//!
//! Policies are fetched once per host and kept for the lifetime of the cache.

use crate::crawler::Colibri;
use crate::robots::{ParsedRobots, RobotsTxt};
use crate::rules::Rule;
use crate::url::{host_key, is_robots_txt, robots_url};
use crate::Error;
use chrono::{DateTime, Utc};
use reqwest::Method;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The host policy
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new CachedRobots stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if a URL is allowed according to the cached policy
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.content.is_allowed(url, user_agent)
    }
}

/// Per-host robots.txt gate
///
/// The first request to a host fetches its robots.txt through the same
/// [`Colibri`] (with robots checking disabled for that request) and caches
/// the resulting policy. Entries are never refreshed; call
/// [`RobotsTxt::clear`] to start over.
#[derive(Debug, Default)]
pub struct RobotsCache {
    hosts: RwLock<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns when the policy of `host` was fetched, if it is cached
    pub fn fetched_at(&self, host: &str) -> Option<DateTime<Utc>> {
        self.hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .map(|cached| cached.fetched_at)
    }

    /// Number of cached hosts
    pub fn len(&self) -> usize {
        self.hosts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, host: &str) -> Option<CachedRobots> {
        self.hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .cloned()
    }

    fn fetch(&self, colibri: &Colibri, rule: &Rule, url: &url::Url) -> crate::Result<CachedRobots> {
        let mut robots_rule = rule.request_only();
        robots_rule.method = Method::GET;
        robots_rule.url = Some(robots_url(url));
        robots_rule.ignore_robots_txt = true;

        info!("Fetching robots.txt for {}", host_key(url));
        let resp = colibri.fetch(&robots_rule)?;
        debug!("robots.txt for {} answered {}", host_key(url), resp.status);

        Ok(CachedRobots::new(ParsedRobots::from_status_and_body(
            resp.status,
            &resp.body,
        )))
    }
}

impl RobotsTxt for RobotsCache {
    fn is_allowed(&self, colibri: &Colibri, rule: &Rule) -> crate::Result<()> {
        let Some(url) = rule.url.as_ref() else {
            return Ok(());
        };
        if is_robots_txt(url) {
            return Ok(());
        }

        let host = host_key(url);
        let cached = match self.cached(&host) {
            Some(cached) => cached,
            None => {
                let cached = self.fetch(colibri, rule, url)?;
                self.hosts
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(host, cached.clone());
                cached
            }
        };

        if cached.is_allowed(url.as_str(), rule.user_agent().unwrap_or("")) {
            Ok(())
        } else {
            Err(Error::RobotsRestriction {
                url: url.to_string(),
            })
        }
    }

    fn clear(&self) {
        self.hosts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
