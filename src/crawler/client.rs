//! HTTP transport implementation
//!
//! This module performs the actual requests described by a [`Rule`]:
//! - Method, headers, proxy and per-request timeout
//! - Redirect following with a per-rule limit, recording every hop
//! - Optional shared cookie store
//! - Response body size limits

use crate::crawler::Response;
use crate::rules::Rule;
use crate::{ConfigError, Error};
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use reqwest::Proxy;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;
use url::Url;

/// Executes requests for [`Colibri`](crate::Colibri)
pub trait Transport: Send + Sync {
    /// Performs the request described by `rule`
    fn execute(&self, rule: &Rule) -> crate::Result<Response>;

    /// Releases any state kept between requests
    fn clear(&self) {}
}

/// Raised from the redirect policy when a rule's redirect limit is exceeded
#[derive(Debug, thiserror::Error)]
#[error("stopped after {max} redirects")]
struct RedirectLimit {
    max: usize,
}

/// Blocking HTTP transport built on reqwest
///
/// A client is built per request, since the redirect limit, timeout, proxy
/// and cookie handling all come from the rule. Rules with `cookies` enabled
/// share one cookie store; without a store (see [`HttpClient::without_cookies`]
/// and [`Transport::clear`]) cookies are neither sent nor kept.
#[derive(Debug)]
pub struct HttpClient {
    jar: RwLock<Option<Arc<Jar>>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::with_jar(Arc::new(Jar::default()))
    }
}

impl HttpClient {
    /// Creates a transport with an empty cookie store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that stores cookies in `jar`
    pub fn with_jar(jar: Arc<Jar>) -> Self {
        Self {
            jar: RwLock::new(Some(jar)),
        }
    }

    /// Creates a transport without a cookie store
    pub fn without_cookies() -> Self {
        Self {
            jar: RwLock::new(None),
        }
    }

    /// Returns the shared cookie store
    pub fn jar(&self) -> Option<Arc<Jar>> {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds an HTTP client configured for one rule
    ///
    /// # Arguments
    ///
    /// * `rule` - The rule being executed
    /// * `redirects` - Receives the URL of every response that redirected
    ///
    /// # Returns
    ///
    /// * `Ok(Client)` - Successfully built HTTP client
    /// * `Err(Error)` - Invalid proxy or TLS initialization failure
    fn build_client(&self, rule: &Rule, redirects: Arc<Mutex<Vec<Url>>>) -> crate::Result<Client> {
        let max = rule.redirects;
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() > max {
                return attempt.error(RedirectLimit { max });
            }

            let from = attempt.previous().last().cloned();
            if let Some(from) = from {
                redirects
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(from);
            }
            attempt.follow()
        });

        let timeout = if rule.timeout.is_zero() {
            None
        } else {
            Some(rule.timeout)
        };

        let mut builder = Client::builder()
            .redirect(policy)
            .timeout(timeout)
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = &rule.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        if rule.cookies {
            if let Some(jar) = self.jar() {
                builder = builder.cookie_provider(jar);
            }
        }

        Ok(builder.build()?)
    }
}

impl Transport for HttpClient {
    fn execute(&self, rule: &Rule) -> crate::Result<Response> {
        let url = rule.url.clone().ok_or(ConfigError::Missing("rule URL"))?;

        let visited = Arc::new(Mutex::new(Vec::new()));
        let client = self.build_client(rule, Arc::clone(&visited))?;

        debug!("{} {}", rule.method, url);
        let sent = client
            .request(rule.method.clone(), url)
            .headers(rule.header.clone())
            .send();

        let redirects = std::mem::take(&mut *visited.lock().unwrap_or_else(PoisonError::into_inner));

        let mut resp = match sent {
            Ok(resp) => resp,
            Err(e) if e.is_redirect() => {
                return Err(Error::MaxRedirects {
                    max: rule.redirects,
                    redirects,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut response = Response::new(resp.url().clone()).with_status(resp.status().as_u16());
        response.header = resp.headers().clone();
        response.redirects = redirects;

        let declared = resp.content_length();
        let limit = rule.response_body_size;

        if limit > 0 {
            (&mut resp).take(limit).read_to_end(&mut response.body)?;
        } else {
            resp.read_to_end(&mut response.body)?;
        }

        debug!(
            "{} answered {} ({} bytes, {} redirects)",
            response.url,
            response.status,
            response.body.len(),
            response.redirects.len()
        );

        match declared {
            Some(length) if limit > 0 && length > limit => Err(Error::BodyTooLarge {
                limit,
                response: Box::new(response),
            }),
            _ => Ok(response),
        }
    }

    fn clear(&self) {
        *self.jar.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
