//! Polite HTTP fetching: retry/backoff, robots.txt compliance, per-domain locks.
//!
//! This crate provides:
//! - [`HttpClient`]: bounded-retry, robots-checked page and asset fetcher
//! - [`RobotsCache`]: lazily fetched, per-host robots.txt rules
//! - [`DomainLocks`]: one async mutex per canonical domain
//! - [`RetryPolicy`] and [`Clock`]: injectable backoff timing

pub mod client;
pub mod locks;
pub mod retry;
pub mod robots;

pub use client::{FetchedDocument, HttpClient, HttpClientBuilder};
pub use locks::{DomainGuard, DomainLocks};
pub use retry::{Clock, ManualClock, RetryPolicy, SystemClock};
pub use robots::{RobotsCache, RobotsTxt};
