//! Feed-advance strategies.
//!
//! A strategy makes one attempt to bring more content into the DOM and
//! reports whether another attempt is worth making. `Ok(false)` means the
//! feed offers no further advance, which ends the crawl gracefully.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::dom::DomSurface;
use crate::error::CrawlError;

/// One attempt to load more content.
#[async_trait]
pub trait AdvanceStrategy: Send + Sync {
    /// Returns whether advancing remains possible after this attempt.
    async fn advance(&self) -> Result<bool, CrawlError>;
}

/// Scroll-to-bottom advance for feeds that load on viewport approach.
///
/// Scrolling always "succeeds"; whether it produced content is judged by the
/// controller's dedup accounting, so this strategy only stops on automation
/// failure. A fixed settle interval follows each scroll because there is no
/// DOM condition that distinguishes "loading" from "exhausted" here.
pub struct InfiniteScroll {
    surface: Arc<dyn DomSurface>,
    settle: Duration,
}

impl InfiniteScroll {
    pub fn new(surface: Arc<dyn DomSurface>, settle: Duration) -> Self {
        Self { surface, settle }
    }
}

#[async_trait]
impl AdvanceStrategy for InfiniteScroll {
    async fn advance(&self) -> Result<bool, CrawlError> {
        self.surface.scroll_to_bottom().await?;
        tokio::time::sleep(self.settle).await;
        Ok(true)
    }
}

/// Click-a-button advance for feeds with an explicit "view more" affordance.
///
/// After a successful click, waits for the item count to grow past its
/// pre-click value. A timed-out wait still returns `Ok(true)`: the round goes
/// into the controller's empty-round streak rather than ending the crawl,
/// since one slow round does not prove exhaustion.
pub struct ClickLoadMore {
    surface: Arc<dyn DomSurface>,
    button: String,
    items: String,
    wait: Duration,
}

impl ClickLoadMore {
    pub fn new(
        surface: Arc<dyn DomSurface>,
        button: impl Into<String>,
        items: impl Into<String>,
        wait: Duration,
    ) -> Self {
        Self {
            surface,
            button: button.into(),
            items: items.into(),
            wait,
        }
    }
}

#[async_trait]
impl AdvanceStrategy for ClickLoadMore {
    async fn advance(&self) -> Result<bool, CrawlError> {
        if !self.surface.exists(&self.button).await? {
            debug!(button = %self.button, "load-more affordance gone, feed exhausted");
            return Ok(false);
        }

        let before = self.surface.count(&self.items).await?;
        self.surface.scroll_into_view(&self.button, 0).await?;
        if !self.surface.click_first(&self.button).await? {
            return Ok(false);
        }

        let grew = self
            .surface
            .wait_for_count_above(&self.items, before, self.wait)
            .await?;
        if !grew {
            debug!(items = %self.items, before, "no count growth after load-more click");
        }
        Ok(true)
    }
}
