//! The convergent pagination loop.
//!
//! One controller drives every feed surface: re-extract everything visible,
//! dedupe by identity, advance, repeat. Termination is decided by unique-item
//! accounting, never by raw DOM growth, so repainted or reordered items
//! cannot stall or inflate a crawl.

pub mod advance;
pub mod dedupe;
pub mod guard;

pub use advance::{AdvanceStrategy, ClickLoadMore, InfiniteScroll};
pub use dedupe::DedupeRegistry;
pub use guard::ChallengeGuard;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::CollectLimits;
use crate::error::CrawlError;
use crate::feeds::FeedAdapter;

/// Generic feed collector.
///
/// The adapter owns extraction, the strategy owns advancing, the guard owns
/// challenge handling; the collector owns only the loop.
pub struct Collector<A: FeedAdapter> {
    guard: Arc<ChallengeGuard>,
    adapter: A,
    strategy: Box<dyn AdvanceStrategy>,
    limits: CollectLimits,
}

impl<A: FeedAdapter> Collector<A> {
    pub fn new(
        guard: Arc<ChallengeGuard>,
        adapter: A,
        strategy: Box<dyn AdvanceStrategy>,
        limits: CollectLimits,
    ) -> Self {
        Self {
            guard,
            adapter,
            strategy,
            limits,
        }
    }

    /// Run the loop to completion.
    ///
    /// Every round re-extracts all visible items; only items whose identity
    /// key is unseen count as progress. The crawl ends when the target is
    /// reached, when `max_empty_rounds` consecutive rounds add nothing, when
    /// the strategy reports no further advance, or at the `max_rounds`
    /// ceiling. An empty first pass is the only content-related hard error.
    pub async fn collect(self) -> Result<Vec<A::Item>, CrawlError> {
        let mut registry = DedupeRegistry::new();

        self.guard.check_or_raise().await?;
        let fresh = self.extract_into(&mut registry).await?;
        if registry.is_empty() {
            return Err(CrawlError::NoContent);
        }
        debug!(fresh, total = registry.len(), "initial extraction pass");

        let mut empty_streak = 0usize;
        let mut rounds = 0usize;

        while registry.len() < self.limits.target
            && empty_streak < self.limits.max_empty_rounds
            && rounds < self.limits.max_rounds
        {
            rounds += 1;

            let can_continue = match self.strategy.advance().await {
                Ok(more) => more,
                Err(e) => {
                    // An advance failure is indistinguishable from exhaustion
                    // at this level; keep whatever was collected.
                    warn!(error = %e, "advance failed, ending crawl with partial results");
                    false
                }
            };
            if !can_continue {
                debug!(rounds, "feed offers no further advance");
                break;
            }

            self.guard.check_or_raise().await?;

            let fresh = self.extract_into(&mut registry).await?;
            if fresh == 0 {
                empty_streak += 1;
                debug!(empty_streak, rounds, "round added no new items");
            } else {
                empty_streak = 0;
                debug!(fresh, total = registry.len(), rounds, "round added items");
            }
        }

        info!(
            collected = registry.len().min(self.limits.target),
            rounds, "crawl finished"
        );
        Ok(registry.into_items(self.limits.target))
    }

    async fn extract_into(
        &self,
        registry: &mut DedupeRegistry<A::Item>,
    ) -> Result<usize, CrawlError> {
        let mut fresh = 0usize;
        for item in self.adapter.extract().await? {
            if registry.insert(item) {
                fresh += 1;
            }
        }
        Ok(fresh)
    }
}
