//! Request orchestration
//!
//! [`Colibri`] ties the collaborators together. For every request it:
//! 1. Applies the default User-Agent
//! 2. Consults the robots.txt gate
//! 3. Waits for the per-host delay
//! 4. Hands the rule to the transport
//!
//! Extraction parses the response and resolves the rule's selectors, which
//! may follow links back through the same pipeline.

use crate::config::Config;
use crate::crawler::delay::{Delay, HostDelay};
use crate::crawler::resolver::Resolver;
use crate::crawler::{HttpClient, Response, Transport};
use crate::output::Output;
use crate::parser::{Parser, Parsers};
use crate::robots::{RobotsCache, RobotsTxt};
use crate::rules::{Rule, DEFAULT_USER_AGENT};
use crate::{ConfigError, Error};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Fetches content and extracts structured data from it according to rules
///
/// Every collaborator is optional, so callers can assemble exactly the
/// behaviour they need; [`Colibri::with_defaults`] installs all of them.
/// A `Colibri` is shared by reference between threads that extract
/// concurrently.
pub struct Colibri {
    /// Performs requests; required by [`Colibri::fetch`]
    pub client: Option<Arc<dyn Transport>>,

    /// Spaces requests to the same host
    pub delay: Option<Arc<dyn Delay>>,

    /// Robots-exclusion gate
    pub robots_txt: Option<Arc<dyn RobotsTxt>>,

    /// Parses responses; required by [`Colibri::extract`]
    pub parser: Option<Arc<dyn Parser>>,

    /// User-Agent set on rules that do not carry one
    pub user_agent: String,

    /// Maximum number of links followed from the first response
    pub max_follow_depth: Option<usize>,
}

impl Default for Colibri {
    fn default() -> Self {
        Self::new()
    }
}

impl Colibri {
    /// Creates a Colibri without any collaborator installed
    pub fn new() -> Self {
        Self {
            client: None,
            delay: None,
            robots_txt: None,
            parser: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_follow_depth: None,
        }
    }

    /// Creates a Colibri with the HTTP transport, per-host delay, robots.txt
    /// gate and the default parsers
    pub fn with_defaults() -> crate::Result<Self> {
        Ok(Self {
            client: Some(Arc::new(HttpClient::new())),
            delay: Some(Arc::new(HostDelay::new())),
            robots_txt: Some(Arc::new(RobotsCache::new())),
            parser: Some(Arc::new(Parsers::with_defaults()?)),
            ..Self::new()
        })
    }

    /// Creates a Colibri from the `[extractor]` configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Colibri)` - Ready to extract
    /// * `Err(Error)` - The default parsers could not be registered
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let extractor = &config.extractor;

        let client = if extractor.cookies {
            HttpClient::new()
        } else {
            HttpClient::without_cookies()
        };

        let mut colibri = Self {
            client: Some(Arc::new(client)),
            parser: Some(Arc::new(Parsers::with_defaults()?)),
            user_agent: extractor.user_agent.clone(),
            max_follow_depth: extractor.max_follow_depth,
            ..Self::new()
        };

        if extractor.delay {
            colibri.delay = Some(Arc::new(HostDelay::new()));
        }
        if extractor.respect_robots {
            colibri.robots_txt = Some(Arc::new(RobotsCache::new()));
        }

        Ok(colibri)
    }

    /// Performs the request described by `rule`
    ///
    /// # Arguments
    ///
    /// * `rule` - The request; selectors are ignored
    ///
    /// # Returns
    ///
    /// * `Ok(Response)` - The buffered response
    /// * `Err(Error::RobotsRestriction)` - robots.txt disallows the URL
    /// * `Err(Error::BodyTooLarge)` - The body was truncated; the error
    ///   carries the truncated response
    /// * `Err(Error)` - Missing transport or URL, transport failure, or an
    ///   unexpected fault
    pub fn fetch(&self, rule: &Rule) -> crate::Result<Response> {
        catch_fault(|| self.fetch_inner(rule))
    }

    fn fetch_inner(&self, rule: &Rule) -> crate::Result<Response> {
        let client = self
            .client
            .as_ref()
            .ok_or(ConfigError::Missing("transport"))?;
        let url = rule.url.as_ref().ok_or(ConfigError::Missing("rule URL"))?;

        let rule = if rule.user_agent().map_or(true, str::is_empty) {
            let mut owned = rule.request_only();
            owned.set_user_agent(&self.user_agent)?;
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(rule)
        };

        if let Some(robots) = &self.robots_txt {
            if !rule.ignore_robots_txt {
                robots.is_allowed(self, &rule)?;
            }
        }

        let _slot = match &self.delay {
            Some(delay) if !rule.delay.is_zero() => {
                delay.wait(url, rule.delay);
                Some(DelaySlot {
                    delay: delay.as_ref(),
                    url,
                })
            }
            _ => None,
        };

        debug!("Fetching {}", url);
        client.execute(&rule)
    }

    /// Fetches `rule`, parses the response and resolves the rule's selectors
    ///
    /// # Returns
    ///
    /// * `Ok(Output)` - Every selector resolved; `data` is `None` when the
    ///   rule has no selectors
    /// * `Err(Error::Extraction)` - Some selectors failed; carries the partial
    ///   output and every failure keyed by selector path
    /// * `Err(Error)` - The request or the parse failed
    pub fn extract(&self, rule: &Rule) -> crate::Result<Output> {
        catch_fault(|| self.extract_at(rule, 0))
    }

    pub(crate) fn extract_at(&self, rule: &Rule, depth: usize) -> crate::Result<Output> {
        let parser = self
            .parser
            .as_ref()
            .ok_or(ConfigError::Missing("parser"))?;

        if let Some(max) = self.max_follow_depth {
            if depth > max {
                return Err(Error::MaxDepth(max));
            }
        }

        let response = self.fetch(rule)?;
        if rule.selectors.is_empty() {
            return Ok(Output::new(response));
        }

        let root = parser.parse(rule, &response)?;
        let (data, errors) = Resolver::new(self, &response, depth).find_selectors(rule, root.as_ref());

        let output = Output {
            response,
            data: Some(data),
        };

        if errors.is_empty() {
            Ok(output)
        } else {
            info!("Extraction of {} finished with {} failures", output.response.url, errors.len());
            Err(Error::Extraction {
                output: Box::new(output),
                errors,
            })
        }
    }

    /// Clears the state of every installed collaborator
    pub fn clear(&self) {
        if let Some(client) = &self.client {
            client.clear();
        }
        if let Some(delay) = &self.delay {
            delay.clear();
        }
        if let Some(robots) = &self.robots_txt {
            robots.clear();
        }
        if let Some(parser) = &self.parser {
            parser.clear();
        }
    }
}

impl fmt::Debug for Colibri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Colibri")
            .field("client", &self.client.is_some())
            .field("delay", &self.delay.is_some())
            .field("robots_txt", &self.robots_txt.is_some())
            .field("parser", &self.parser.is_some())
            .field("user_agent", &self.user_agent)
            .field("max_follow_depth", &self.max_follow_depth)
            .finish()
    }
}

/// Stamps the host and releases its gate once the request is over, whether
/// it succeeded, failed or panicked
struct DelaySlot<'a> {
    delay: &'a dyn Delay,
    url: &'a Url,
}

impl Drop for DelaySlot<'_> {
    fn drop(&mut self) {
        self.delay.stamp(self.url);
        self.delay.done(self.url);
    }
}

/// Runs `f`, turning a panic into [`Error::Panic`]
fn catch_fault<T>(f: impl FnOnce() -> crate::Result<T>) -> crate::Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
