//! Feed surfaces and their extraction adapters.
//!
//! Each adapter knows one feed's markup: which selector set it reads and how
//! raw DOM text becomes a typed record. Adapters are stateless with respect
//! to the loop; they re-extract everything visible on every call and leave
//! dedup to the collector.

pub mod audio;
pub mod comments;
pub mod hashtag;
pub mod video;

pub use audio::{AudioAdapter, AudioRecord};
pub use comments::{CommentNode, CommentReply, ThreadAdapter, UserRef};
pub use hashtag::{HashtagAdapter, HashtagRecord};
pub use video::{VideoAdapter, VideoRecord};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::PrepareConfig;
use crate::dom::DomSurface;
use crate::error::CrawlError;

/// A record with a stable identity for dedup.
pub trait FeedRecord: Send {
    /// Key under which repeat sightings of this record collapse.
    fn identity_key(&self) -> String;
}

/// Extracts every currently visible record from one feed surface.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    type Item: FeedRecord;

    async fn extract(&self) -> Result<Vec<Self::Item>, CrawlError>;
}

/// The feed surfaces the engine knows how to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Videos,
    Hashtags,
    Audio,
    Comments,
}

/// Ceiling on how long `prepare` waits for any one dismissable element.
const DISMISS_WAIT: Duration = Duration::from_secs(5);

/// One-time page preparation before the pagination loop starts.
///
/// Dismissals and the dropdown filter are best-effort: each dismissable
/// element gets a short bounded wait (banners can render a moment after
/// navigation), and one that never appears is skipped, not an error.
/// Preparation is never revisited once the loop is running.
pub async fn prepare(
    surface: &Arc<dyn DomSurface>,
    config: &PrepareConfig,
    settle: Duration,
) -> Result<(), CrawlError> {
    for selector in &config.dismiss {
        if surface.wait_for_present(selector, DISMISS_WAIT).await? {
            surface.click_first(selector).await?;
            debug!(selector = %selector, "dismissed pre-crawl element");
            tokio::time::sleep(settle).await;
        }
    }

    if let Some(filter) = &config.filter {
        if surface.type_into(&filter.input, &filter.value).await? {
            tokio::time::sleep(settle).await;
            if !surface.click_first(&filter.option).await? {
                debug!(option = %filter.option, "filter option never appeared");
            }
            tokio::time::sleep(settle).await;
        }
    }

    Ok(())
}
