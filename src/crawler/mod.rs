//! Crawler module for fetching and extracting content
//!
//! This module contains the core extraction logic, including:
//! - Request orchestration (robots.txt, per-host delay, transport)
//! - HTTP fetching with bounded redirects and body sizes
//! - Selector resolution and link following

mod client;
mod colibri;
mod delay;
mod resolver;
mod response;

pub use client::{HttpClient, Transport};
pub use colibri::Colibri;
pub use delay::{Delay, HostDelay};
pub use response::Response;
