//! Crawl orchestration: wires a session, a feed adapter, and an advance
//! strategy together for each target, with bounded concurrency across
//! targets and a retry pass for challenge failures.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::browser::Session;
use crate::config::{CollectLimits, SelectorProfile, Timing};
use crate::crawl::{ChallengeGuard, ClickLoadMore, Collector, InfiniteScroll};
use crate::dom::DomSurface;
use crate::error::CrawlError;
use crate::feeds::{
    self, AudioAdapter, AudioRecord, CommentNode, FeedKind, HashtagAdapter, HashtagRecord,
    ThreadAdapter, VideoAdapter, VideoRecord,
};

/// One page to crawl.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub url: String,
    pub kind: FeedKind,
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub limits: CollectLimits,
    pub timing: Timing,
    pub profile: SelectorProfile,
    /// Targets crawled at once when running a batch.
    pub concurrency: usize,
    /// Full re-runs granted after a retriable failure.
    pub retries: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            limits: CollectLimits::default(),
            timing: Timing::default(),
            profile: SelectorProfile::default(),
            concurrency: 2,
            retries: 1,
        }
    }
}

/// Typed result of one crawl, serialized as a bare record array.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CrawlOutput {
    Videos(Vec<VideoRecord>),
    Hashtags(Vec<HashtagRecord>),
    Audio(Vec<AudioRecord>),
    Comments(Vec<CommentNode>),
}

impl CrawlOutput {
    pub fn len(&self) -> usize {
        match self {
            CrawlOutput::Videos(v) => v.len(),
            CrawlOutput::Hashtags(v) => v.len(),
            CrawlOutput::Audio(v) => v.len(),
            CrawlOutput::Comments(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn crawl_once(
    session: &Session,
    target: &CrawlTarget,
    opts: &CrawlOptions,
) -> Result<CrawlOutput, CrawlError> {
    let surface = session.open(&target.url).await?;
    crawl_surface(surface, target.kind, opts).await
}

/// Drive one feed crawl over an open surface, closing the page afterward
/// whether the crawl succeeded or not. A page left open keeps its DOM and
/// network state alive for the rest of the session.
async fn crawl_surface(
    surface: Arc<dyn DomSurface>,
    kind: FeedKind,
    opts: &CrawlOptions,
) -> Result<CrawlOutput, CrawlError> {
    let outcome = drive_feed(Arc::clone(&surface), kind, opts).await;
    if let Err(e) = surface.close().await {
        warn!(error = %e, "failed to close page");
    }
    outcome
}

/// Wait for the feed's item selector to render before the first extraction
/// pass. Content lagging behind navigation is ordinary latency; a scroll
/// nudge covers feeds that only render on viewport approach. Still-absent
/// content falls through to the collector, whose empty first pass names the
/// real failure (selector drift).
async fn await_first_content(
    surface: &Arc<dyn DomSurface>,
    selector: &str,
    wait: Duration,
) -> Result<(), CrawlError> {
    if surface.wait_for_present(selector, wait).await? {
        return Ok(());
    }
    debug!(selector = %selector, "items not rendered yet, nudging with a scroll");
    surface.scroll_to_bottom().await?;
    surface.wait_for_present(selector, wait).await?;
    Ok(())
}

async fn drive_feed(
    surface: Arc<dyn DomSurface>,
    kind: FeedKind,
    opts: &CrawlOptions,
) -> Result<CrawlOutput, CrawlError> {
    let settle = Duration::from_millis(opts.timing.settle_ms);
    let wait = Duration::from_millis(opts.timing.wait_ms);

    feeds::prepare(&surface, &opts.profile.prepare, settle).await?;

    let item_selector = match kind {
        FeedKind::Videos => &opts.profile.video.card,
        FeedKind::Hashtags => &opts.profile.hashtag.title,
        FeedKind::Audio => &opts.profile.audio.detail_link,
        FeedKind::Comments => &opts.profile.comments.thread,
    };
    await_first_content(&surface, item_selector, wait).await?;

    let guard = Arc::new(ChallengeGuard::new(
        surface.clone(),
        opts.profile.challenge.clone(),
        Duration::from_millis(opts.timing.challenge_settle_ms),
    ));

    match kind {
        FeedKind::Videos => {
            let sel = opts.profile.video.clone();
            let strategy = ClickLoadMore::new(
                Arc::clone(&surface),
                sel.load_more.clone(),
                sel.card.clone(),
                wait,
            );
            let adapter = VideoAdapter::new(surface, sel);
            Collector::new(guard, adapter, Box::new(strategy), opts.limits)
                .collect()
                .await
                .map(CrawlOutput::Videos)
        }
        FeedKind::Hashtags => {
            let sel = opts.profile.hashtag.clone();
            let strategy = ClickLoadMore::new(
                Arc::clone(&surface),
                sel.load_more.clone(),
                sel.title.clone(),
                wait,
            );
            let adapter = HashtagAdapter::new(surface, sel);
            Collector::new(guard, adapter, Box::new(strategy), opts.limits)
                .collect()
                .await
                .map(CrawlOutput::Hashtags)
        }
        FeedKind::Audio => {
            let sel = opts.profile.audio.clone();
            let strategy = ClickLoadMore::new(
                Arc::clone(&surface),
                sel.load_more.clone(),
                sel.detail_link.clone(),
                wait,
            );
            let adapter = AudioAdapter::new(surface, sel);
            Collector::new(guard, adapter, Box::new(strategy), opts.limits)
                .collect()
                .await
                .map(CrawlOutput::Audio)
        }
        FeedKind::Comments => {
            let sel = opts.profile.comments.clone();
            let strategy = InfiniteScroll::new(Arc::clone(&surface), settle);
            let adapter = ThreadAdapter::new(surface, sel, Arc::clone(&guard), settle);
            Collector::new(guard, adapter, Box::new(strategy), opts.limits)
                .collect()
                .await
                .map(CrawlOutput::Comments)
        }
    }
}

/// Crawl one target, re-running on retriable failures up to `opts.retries`
/// extra attempts.
pub async fn crawl_target(
    session: &Session,
    target: &CrawlTarget,
    opts: &CrawlOptions,
) -> Result<CrawlOutput, CrawlError> {
    with_retry(opts.retries, || crawl_once(session, target, opts)).await
}

/// Crawl a batch of targets with bounded concurrency. Results come back in
/// input order, one per target, failures included.
pub async fn run_targets(
    session: &Session,
    targets: &[CrawlTarget],
    opts: &CrawlOptions,
) -> Vec<Result<CrawlOutput, CrawlError>> {
    let concurrency = opts.concurrency.max(1);
    stream::iter(targets.iter().enumerate())
        .map(|(i, target)| async move {
            let outcome = crawl_target(session, target, opts).await;
            match &outcome {
                Ok(out) => info!(url = %target.url, collected = out.len(), "target finished"),
                Err(e) => warn!(url = %target.url, error = %e, "target failed"),
            }
            (i, outcome)
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .fold(
            (0..targets.len())
                .map(|_| Err(CrawlError::Config("target never ran".to_string())))
                .collect::<Vec<_>>(),
            |mut acc, (i, outcome)| {
                acc[i] = outcome;
                acc
            },
        )
}

async fn with_retry<T, F, Fut>(retries: usize, mut op: F) -> Result<T, CrawlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CrawlError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retriable() && attempt < retries => {
                attempt += 1;
                warn!(error = %e, attempt, "retriable failure, re-running crawl");
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::ChallengeSelectors;
    use crate::dom::mock::MockSurface;

    fn fast_opts(target: usize) -> CrawlOptions {
        CrawlOptions {
            limits: CollectLimits::with_target(target),
            timing: crate::config::Timing {
                settle_ms: 1,
                wait_ms: 10,
                challenge_settle_ms: 1,
            },
            profile: SelectorProfile::default(),
            concurrency: 1,
            retries: 0,
        }
    }

    #[tokio::test]
    async fn render_latency_before_first_pass_is_absorbed() {
        let mock = Arc::new(MockSurface::new());
        let profile = SelectorProfile::default();
        // Cards absent right after navigation, rendered after the nudge.
        mock.push_wait(&profile.video.card, false);
        mock.push_wait(&profile.video.card, true);
        mock.push_count(&profile.challenge.overlay, 0);
        mock.push_attrs(&profile.video.card, &["v1", "v2"]);

        let out = crawl_surface(mock.clone(), FeedKind::Videos, &fast_opts(2))
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(mock.scrolls.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn page_closes_after_crawl_success() {
        let mock = Arc::new(MockSurface::new());
        let profile = SelectorProfile::default();
        mock.push_wait(&profile.video.card, true);
        mock.push_count(&profile.challenge.overlay, 0);
        mock.push_attrs(&profile.video.card, &["v1"]);

        crawl_surface(mock.clone(), FeedKind::Videos, &fast_opts(1))
            .await
            .unwrap();
        assert_eq!(mock.closes.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn page_closes_after_challenge_failure() {
        let mock = Arc::new(MockSurface::new());
        let profile = SelectorProfile::default();
        mock.push_wait(&profile.video.card, true);
        mock.push_count(&ChallengeSelectors::default().overlay, 1);

        let err = crawl_surface(mock.clone(), FeedKind::Videos, &fast_opts(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::ChallengeUnresolved));
        assert_eq!(mock.closes.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn retriable_failures_are_retried_up_to_budget() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(2, || {
            calls.fetch_add(1, Ordering::Relaxed);
            async { Err(CrawlError::ChallengeUnresolved) }
        })
        .await;

        assert!(matches!(result, Err(CrawlError::ChallengeUnresolved)));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn non_retriable_failures_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(2, || {
            calls.fetch_add(1, Ordering::Relaxed);
            async { Err(CrawlError::NoContent) }
        })
        .await;

        assert!(matches!(result, Err(CrawlError::NoContent)));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn success_after_retry_is_returned() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(2, || {
            let n = calls.fetch_add(1, Ordering::Relaxed);
            async move {
                if n == 0 {
                    Err(CrawlError::ChallengeUnresolved)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
    }
}
