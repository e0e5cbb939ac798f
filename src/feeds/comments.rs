//! Nested comment-thread extraction.
//!
//! A thread is one parent comment plus its depth-2 replies. Everything below
//! operates within a single thread wrapper through scoped reads; a global
//! query here would pair one thread's replies with another's users, which is
//! exactly the failure this module exists to avoid.
//!
//! The page exposes no numeric user id, so the profile handle from the
//! anchor href serves as the stable user identity.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{FeedAdapter, FeedRecord};
use crate::config::CommentSelectors;
use crate::counters::parse_count;
use crate::crawl::ChallengeGuard;
use crate::dom::DomSurface;
use crate::error::CrawlError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserRef {
    pub user_handle: Option<String>,
    pub display_name: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentReply {
    pub text: String,
    pub user: UserRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub text: String,
    pub user: UserRef,
    pub like_count: u64,
    pub replies: Vec<CommentReply>,
}

impl FeedRecord for CommentNode {
    /// Author handle plus text. Two users can post identical text, and one
    /// user can post twice; only the pair is stable across repaints.
    fn identity_key(&self) -> String {
        format!(
            "{}\u{1f}{}",
            self.user.user_handle.as_deref().unwrap_or(""),
            self.text
        )
    }
}

/// Pull the profile handle out of an anchor href: the segment after the last
/// `/@`, with any query string and trailing slashes removed.
pub fn extract_handle(href: &str) -> Option<String> {
    let tail = href.rsplit_once("/@")?.1;
    let handle = tail
        .split('?')
        .next()
        .unwrap_or(tail)
        .trim()
        .trim_matches('/');
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

fn build_user(href: Option<&String>, label: Option<&String>, base_url: &str) -> UserRef {
    let handle = href.and_then(|h| extract_handle(h));
    let display_name = label
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .or_else(|| handle.clone());
    let profile_url = handle.as_ref().map(|h| format!("{base_url}/@{h}"));
    UserRef {
        user_handle: handle,
        display_name,
        profile_url,
    }
}

/// Extracts every visible thread, expanding replies per thread first.
///
/// One extraction pass performs many interactions (per-thread scrolls and
/// reveal clicks), so the guard is re-checked before each thread: an
/// interstitial appearing mid-assembly must abort the pass, not soak up
/// clicks until the next pagination round.
pub struct ThreadAdapter {
    surface: Arc<dyn DomSurface>,
    selectors: CommentSelectors,
    guard: Arc<ChallengeGuard>,
    settle: Duration,
}

impl ThreadAdapter {
    pub fn new(
        surface: Arc<dyn DomSurface>,
        selectors: CommentSelectors,
        guard: Arc<ChallengeGuard>,
        settle: Duration,
    ) -> Self {
        Self {
            surface,
            selectors,
            guard,
            settle,
        }
    }

    /// Click reveal affordances inside one thread until a round lands no
    /// clicks or the round ceiling is hit. A click can spawn a replacement
    /// affordance, so "nothing left to click" is the only reliable done
    /// signal and the ceiling bounds threads that never reach it.
    async fn expand_replies(&self, index: usize) -> Result<(), CrawlError> {
        for round in 0..self.selectors.reply_rounds {
            let mut clicked = 0;
            for reveal in &self.selectors.reveal_replies {
                clicked += self
                    .surface
                    .scoped_click_all(&self.selectors.thread, index, reveal)
                    .await?;
            }
            if clicked == 0 {
                break;
            }
            debug!(thread = index, round, clicked, "expanded reply batch");
            tokio::time::sleep(self.settle).await;
        }
        Ok(())
    }

    async fn user_parts(
        &self,
        index: usize,
        user_box: &str,
    ) -> Result<(Vec<String>, Vec<String>), CrawlError> {
        let anchors = format!("{user_box} {}", self.selectors.user_anchor);
        let labels = format!("{user_box} {}", self.selectors.user_label);
        let hrefs = self
            .surface
            .scoped_attrs(&self.selectors.thread, index, &anchors, "href")
            .await?;
        let names = self
            .surface
            .scoped_texts(&self.selectors.thread, index, &labels)
            .await?;
        Ok((hrefs, names))
    }

    /// Assemble the thread at `index`. Returns `None` when the parent text is
    /// empty, which marks a placeholder or deleted comment.
    async fn assemble(&self, index: usize) -> Result<Option<CommentNode>, CrawlError> {
        self.surface
            .scroll_into_view(&self.selectors.thread, index)
            .await?;
        self.expand_replies(index).await?;

        let root_texts = self
            .surface
            .scoped_texts(&self.selectors.thread, index, &self.selectors.root_text)
            .await?;
        let text = root_texts
            .first()
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Ok(None);
        }

        let (root_hrefs, root_names) = self.user_parts(index, &self.selectors.user_root).await?;
        let user = build_user(
            root_hrefs.first(),
            root_names.first(),
            &self.selectors.profile_base_url,
        );

        let reply_texts = self
            .surface
            .scoped_texts(&self.selectors.thread, index, &self.selectors.reply_text)
            .await?;
        let (reply_hrefs, reply_names) = self.user_parts(index, &self.selectors.user_reply).await?;

        // Strict index-wise pairing within this thread only. When the text
        // and user lists disagree in length the unpaired tail is dropped
        // rather than guessed at.
        let paired = reply_texts.len().min(reply_hrefs.len());
        let replies = (0..paired)
            .map(|j| CommentReply {
                text: reply_texts[j].trim().to_string(),
                user: build_user(
                    reply_hrefs.get(j),
                    reply_names.get(j),
                    &self.selectors.profile_base_url,
                ),
            })
            // A user box with no text is a rendering artifact, not a reply.
            .filter(|r| !r.text.is_empty())
            .collect();

        let like_texts = self
            .surface
            .scoped_texts(&self.selectors.thread, index, &self.selectors.like_count)
            .await?;
        let like_count = like_texts.first().map(|t| parse_count(t)).unwrap_or(0);

        Ok(Some(CommentNode {
            text,
            user,
            like_count,
            replies,
        }))
    }
}

#[async_trait]
impl FeedAdapter for ThreadAdapter {
    type Item = CommentNode;

    async fn extract(&self) -> Result<Vec<CommentNode>, CrawlError> {
        let total = self.surface.count(&self.selectors.thread).await?;
        let mut nodes = Vec::new();
        for index in 0..total {
            self.guard.check_or_raise().await?;
            if let Some(node) = self.assemble(index).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }
}
