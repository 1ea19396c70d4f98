//! Per-host request spacing
//!
//! Requests to the same host are admitted one at a time, in arrival order, and
//! no sooner than the configured delay after the previous request to that host
//! completed. Different hosts never wait on each other.

use crate::url::host_key;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;
use url::Url;

/// Spacing between requests to the same host
pub trait Delay: Send + Sync {
    /// Blocks until the previous request to the URL's host is done and the
    /// delay since it has elapsed
    fn wait(&self, url: &Url, delay: Duration);

    /// Signals that the request to the URL's host has been made
    fn done(&self, url: &Url);

    /// Records when the request to the URL's host finished
    fn stamp(&self, url: &Url);

    /// Forgets every host and releases every waiter
    fn clear(&self);
}

#[derive(Debug, Default)]
struct GateState {
    // at most one pending signal is kept
    pending: bool,
    closed: bool,
}

/// Single-slot signal shared by the requests to one host
#[derive(Debug, Default)]
struct Gate {
    state: Mutex<GateState>,
    signal: Condvar,
}

impl Gate {
    fn acquire(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while !state.pending && !state.closed {
            state = self
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.pending = false;
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending = true;
        self.signal.notify_one();
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.signal.notify_all();
    }
}

/// Default [`Delay`] keyed by host (and explicit port)
#[derive(Debug, Default)]
pub struct HostDelay {
    timestamps: RwLock<HashMap<String, Instant>>,
    gates: RwLock<HashMap<String, Arc<Gate>>>,
}

impl HostDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether a request to the URL's host has been stamped
    pub fn has_visited(&self, url: &Url) -> bool {
        self.timestamps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&host_key(url))
    }

    /// Returns the gate of `host`, or registers one and returns `None` when
    /// this is the first request to the host
    fn gate(&self, host: &str) -> Option<Arc<Gate>> {
        if let Some(gate) = self
            .gates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
        {
            return Some(Arc::clone(gate));
        }

        let mut gates = self.gates.write().unwrap_or_else(PoisonError::into_inner);
        match gates.get(host) {
            Some(gate) => Some(Arc::clone(gate)),
            None => {
                gates.insert(host.to_string(), Arc::new(Gate::default()));
                None
            }
        }
    }
}

impl Delay for HostDelay {
    fn wait(&self, url: &Url, delay: Duration) {
        let host = host_key(url);

        if let Some(gate) = self.gate(&host) {
            trace!("Waiting for previous request to {}", host);
            gate.acquire();
        }

        let last = self
            .timestamps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host)
            .copied();

        if let Some(last) = last {
            let elapsed = last.elapsed();
            if elapsed < delay {
                let remaining = delay - elapsed;
                trace!("Delaying request to {} by {:?}", host, remaining);
                thread::sleep(remaining);
            }
        }
    }

    fn done(&self, url: &Url) {
        let gate = self
            .gates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host_key(url))
            .cloned();

        if let Some(gate) = gate {
            gate.release();
        }
    }

    fn stamp(&self, url: &Url) {
        self.timestamps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host_key(url), Instant::now());
    }

    fn clear(&self) {
        self.timestamps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let mut gates = self.gates.write().unwrap_or_else(PoisonError::into_inner);
        for (_, gate) in gates.drain() {
            gate.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(80);

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    /// Runs the wait/request/stamp/done sequence and returns when the request started
    fn request(delay: &HostDelay, u: &Url) -> Instant {
        delay.wait(u, DELAY);
        let started = Instant::now();
        delay.stamp(u);
        delay.done(u);
        started
    }

    #[test]
    fn test_first_visit_does_not_wait() {
        let delay = HostDelay::new();
        let u = url("https://a.test/1");

        let start = Instant::now();
        delay.wait(&u, Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!delay.has_visited(&u));
    }

    #[test]
    fn test_same_host_spaced() {
        let delay = HostDelay::new();
        let first = request(&delay, &url("https://a.test/1"));
        let second = request(&delay, &url("https://a.test/2"));

        assert!(second.duration_since(first) >= DELAY);
        assert!(delay.has_visited(&url("https://a.test/")));
    }

    #[test]
    fn test_distinct_hosts_not_delayed() {
        let delay = HostDelay::new();
        request(&delay, &url("https://a.test/"));

        let start = Instant::now();
        request(&delay, &url("https://b.test/"));
        request(&delay, &url("https://a.test:8443/"));
        assert!(start.elapsed() < DELAY);
    }

    #[test]
    fn test_concurrent_requests_are_serialized() {
        let delay = Arc::new(HostDelay::new());
        let starts = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let delay = Arc::clone(&delay);
                let starts = Arc::clone(&starts);
                thread::spawn(move || {
                    let started = request(&delay, &url(&format!("https://a.test/{}", i)));
                    starts.lock().unwrap().push(started);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut starts = starts.lock().unwrap().clone();
        starts.sort();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= DELAY);
        }
    }

    #[test]
    fn test_clear_releases_waiters() {
        let delay = Arc::new(HostDelay::new());
        let u = url("https://a.test/");

        // first visitor registers the gate but never signals it
        delay.wait(&u, DELAY);

        let waiter = {
            let delay = Arc::clone(&delay);
            let u = u.clone();
            thread::spawn(move || delay.wait(&u, DELAY))
        };

        thread::sleep(Duration::from_millis(50));
        delay.clear();
        waiter.join().unwrap();

        assert!(!delay.has_visited(&u));
    }
}
