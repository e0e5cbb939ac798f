//! Convergent crawler for incrementally-loading trend feeds.
//!
//! One pagination loop ([`crawl::Collector`]) drives every surface: it
//! re-extracts all visible items each round, dedupes them by stable identity,
//! and advances the feed until a target count, an empty-round streak, or an
//! exhausted feed ends the crawl. Feed-specific knowledge lives in
//! [`feeds`] adapters; page automation goes through the [`dom::DomSurface`]
//! seam so everything above the browser is testable without one.

pub mod browser;
pub mod cli;
pub mod config;
pub mod counters;
pub mod crawl;
pub mod dom;
pub mod error;
pub mod feeds;
pub mod runner;

pub use config::{CollectLimits, SelectorProfile, Timing};
pub use crawl::Collector;
pub use error::CrawlError;
pub use runner::{CrawlOptions, CrawlOutput, CrawlTarget};
