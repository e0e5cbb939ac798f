//! Error taxonomy for feed crawls.
//!
//! Only two conditions abort a crawl: an interstitial challenge that survives
//! every dismissal attempt, and a first extraction pass that finds nothing
//! (almost always stale selectors). Everything else is absorbed into the
//! controller's empty-round accounting or degraded to a field default.

use thiserror::Error;

/// Errors surfaced by crawl components.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A verification interstitial is blocking the page and none of the
    /// dismissal attempts cleared it. Retriable by re-running the whole
    /// crawl invocation.
    #[error("verification challenge could not be dismissed")]
    ChallengeUnresolved,

    /// The first extraction pass yielded zero items. Distinct from normal
    /// exhaustion: the feed never rendered anything we recognize, which
    /// usually means the configured selectors no longer match the markup.
    #[error("feed produced no items on the first extraction pass (stale selectors?)")]
    NoContent,

    /// A bounded wait elapsed. Treated as "no growth this round" inside the
    /// loop, never as a hard failure.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// Browser automation failed at the CDP level.
    #[error("browser automation error: {0}")]
    Automation(#[from] chromiumoxide::error::CdpError),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CrawlError {
    /// True for failures the caller can reasonably retry from scratch.
    pub fn is_retriable(&self) -> bool {
        matches!(self, CrawlError::ChallengeUnresolved)
    }
}
