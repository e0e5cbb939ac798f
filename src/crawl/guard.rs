//! Challenge interstitial handling.
//!
//! Verification overlays can appear at any point in a crawl. The guard is
//! checked before the first extraction and after every advance; it makes a
//! fixed sequence of dismissal attempts and raises the crawl's only
//! challenge-related hard error when none of them clears the overlay.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ChallengeSelectors;
use crate::dom::DomSurface;
use crate::error::CrawlError;

/// Detects and attempts to dismiss verification overlays.
pub struct ChallengeGuard {
    surface: Arc<dyn DomSurface>,
    selectors: ChallengeSelectors,
    settle: Duration,
}

impl ChallengeGuard {
    pub fn new(
        surface: Arc<dyn DomSurface>,
        selectors: ChallengeSelectors,
        settle: Duration,
    ) -> Self {
        Self {
            surface,
            selectors,
            settle,
        }
    }

    /// Return `Ok(())` when the page is unobstructed, attempting dismissal
    /// first if an overlay is present.
    ///
    /// Dismissal attempts, in order: click the close affordance, reload the
    /// page, click the alternate-mode affordance. The overlay is re-checked
    /// after each attempt; if it survives all three the crawl cannot
    /// continue.
    pub async fn check_or_raise(&self) -> Result<(), CrawlError> {
        if !self.surface.exists(&self.selectors.overlay).await? {
            return Ok(());
        }
        warn!("verification challenge detected, attempting dismissal");

        if self.surface.click_first(&self.selectors.close).await? {
            tokio::time::sleep(self.settle).await;
            if !self.surface.exists(&self.selectors.overlay).await? {
                info!("challenge dismissed via close affordance");
                return Ok(());
            }
        }

        self.surface.reload().await?;
        tokio::time::sleep(self.settle).await;
        if !self.surface.exists(&self.selectors.overlay).await? {
            info!("challenge cleared by reload");
            return Ok(());
        }

        if self.surface.click_first(&self.selectors.alternate).await? {
            tokio::time::sleep(self.settle).await;
            if !self.surface.exists(&self.selectors.overlay).await? {
                info!("challenge dismissed via alternate mode");
                return Ok(());
            }
        }

        Err(CrawlError::ChallengeUnresolved)
    }
}
