//! Crawl configuration types.
//!
//! Selector strings are opaque lookup keys: the engine never interprets them,
//! it hands them to the page verbatim. Defaults match the feed markup the
//! crawler was built against; every set can be overridden from a JSON profile
//! file when the markup drifts. Selector sets are immutable once a crawl is
//! constructed — nothing here is module-level mutable state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

/// Bounds for one pagination run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollectLimits {
    /// Stop once this many unique items are collected.
    #[serde(default = "default_target")]
    pub target: usize,
    /// Stop after this many consecutive rounds without a new item. Content
    /// can lag one round behind an advance, so a single empty round is
    /// expected and not terminal.
    #[serde(default = "default_max_empty_rounds")]
    pub max_empty_rounds: usize,
    /// Hard ceiling on advance rounds, independent of the empty-round streak.
    /// Guards against feeds that keep nominally advancing without net growth.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for CollectLimits {
    fn default() -> Self {
        Self {
            target: default_target(),
            max_empty_rounds: default_max_empty_rounds(),
            max_rounds: default_max_rounds(),
        }
    }
}

impl CollectLimits {
    /// Limits with a specific target and default stall bounds.
    pub fn with_target(target: usize) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

fn default_target() -> usize {
    100
}
fn default_max_empty_rounds() -> usize {
    3
}
fn default_max_rounds() -> usize {
    60
}

/// Per-call automation timing, all bounded and local to one operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timing {
    /// Settle interval after a scroll advance, milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Ceiling for condition-based waits (element presence, count growth),
    /// milliseconds.
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
    /// Settle interval after a challenge dismissal attempt, milliseconds.
    #[serde(default = "default_challenge_settle_ms")]
    pub challenge_settle_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            wait_ms: default_wait_ms(),
            challenge_settle_ms: default_challenge_settle_ms(),
        }
    }
}

fn default_settle_ms() -> u64 {
    800
}
fn default_wait_ms() -> u64 {
    10_000
}
fn default_challenge_settle_ms() -> u64 {
    1_000
}

/// Video-card feed selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSelectors {
    /// Card element carrying the video id attribute.
    #[serde(default = "default_video_card")]
    pub card: String,
    /// Attribute holding the stable video id.
    #[serde(default = "default_video_id_attr")]
    pub id_attr: String,
    /// "Load more" affordance.
    #[serde(default = "default_video_load_more")]
    pub load_more: String,
    /// Template for the canonical video URL; `{id}` is substituted.
    #[serde(default = "default_video_url_template")]
    pub url_template: String,
}

impl Default for VideoSelectors {
    fn default() -> Self {
        Self {
            card: default_video_card(),
            id_attr: default_video_id_attr(),
            load_more: default_video_load_more(),
            url_template: default_video_url_template(),
        }
    }
}

fn default_video_card() -> String {
    "div[class*='cardWrapper'] blockquote[data-video-id]".to_string()
}
fn default_video_id_attr() -> String {
    "data-video-id".to_string()
}
fn default_video_load_more() -> String {
    "div[data-testid='cc_contentArea_viewmore_btn']".to_string()
}
fn default_video_url_template() -> String {
    "https://www.tiktok.com/@_/video/{id}".to_string()
}

/// Hashtag-tile feed selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagSelectors {
    /// Tile title element whose text is the hashtag.
    #[serde(default = "default_hashtag_title")]
    pub title: String,
    /// "View more" affordance.
    #[serde(default = "default_hashtag_load_more")]
    pub load_more: String,
}

impl Default for HashtagSelectors {
    fn default() -> Self {
        Self {
            title: default_hashtag_title(),
            load_more: default_hashtag_load_more(),
        }
    }
}

fn default_hashtag_title() -> String {
    "span[class*='CardPc_titleText']".to_string()
}
fn default_hashtag_load_more() -> String {
    "div[class*='ViewMoreBtn_viewMoreBtn'] > div".to_string()
}

/// Audio-tile feed selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSelectors {
    /// Anchor linking to the track detail page; its href carries the
    /// `song/<name>-<id>` segment.
    #[serde(default = "default_audio_link")]
    pub detail_link: String,
    /// "View more" affordance.
    #[serde(default = "default_audio_load_more")]
    pub load_more: String,
    /// Public base URL for reconstructed track pages.
    #[serde(default = "default_music_base")]
    pub music_base_url: String,
}

impl Default for AudioSelectors {
    fn default() -> Self {
        Self {
            detail_link: default_audio_link(),
            load_more: default_audio_load_more(),
            music_base_url: default_music_base(),
        }
    }
}

fn default_audio_link() -> String {
    "a[class*='goToDetailBtnWrapper']".to_string()
}
fn default_audio_load_more() -> String {
    "div[class*='ViewMoreBtn_viewMoreBtn'] > div".to_string()
}
fn default_music_base() -> String {
    "https://www.tiktok.com/music/".to_string()
}

/// Comment-thread selectors. All `reply_*` and `user_*` reads are scoped to
/// one thread wrapper; they must never be queried globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentSelectors {
    /// Wrapper element of one parent comment thread.
    #[serde(default = "default_comment_thread")]
    pub thread: String,
    /// Parent comment text node (depth 1), within a wrapper.
    #[serde(default = "default_comment_root_text")]
    pub root_text: String,
    /// Reply text nodes (depth 2), within a wrapper.
    #[serde(default = "default_comment_reply_text")]
    pub reply_text: String,
    /// Parent-comment user box, within a wrapper.
    #[serde(default = "default_comment_user_root")]
    pub user_root: String,
    /// Reply user boxes, within a wrapper.
    #[serde(default = "default_comment_user_reply")]
    pub user_reply: String,
    /// Profile anchors within a user box; the href encodes the handle.
    #[serde(default = "default_comment_user_anchor")]
    pub user_anchor: String,
    /// Display-name label anchors within a user box.
    #[serde(default = "default_comment_user_label")]
    pub user_label: String,
    /// Like-count element, within a wrapper.
    #[serde(default = "default_comment_like")]
    pub like_count: String,
    /// "View N replies" affordances, within a wrapper. Clicking one can spawn
    /// a replacement, so expansion is round-bounded.
    #[serde(default = "default_comment_reveal")]
    pub reveal_replies: Vec<String>,
    /// Ceiling on reveal rounds per thread.
    #[serde(default = "default_reply_rounds")]
    pub reply_rounds: usize,
    /// Base URL for reconstructing profile links.
    #[serde(default = "default_profile_base")]
    pub profile_base_url: String,
}

impl Default for CommentSelectors {
    fn default() -> Self {
        Self {
            thread: default_comment_thread(),
            root_text: default_comment_root_text(),
            reply_text: default_comment_reply_text(),
            user_root: default_comment_user_root(),
            user_reply: default_comment_user_reply(),
            user_anchor: default_comment_user_anchor(),
            user_label: default_comment_user_label(),
            like_count: default_comment_like(),
            reveal_replies: default_comment_reveal(),
            reply_rounds: default_reply_rounds(),
            profile_base_url: default_profile_base(),
        }
    }
}

fn default_comment_thread() -> String {
    "div[class*='DivCommentObjectWrapper']".to_string()
}
fn default_comment_root_text() -> String {
    "span[data-e2e='comment-level-1']".to_string()
}
fn default_comment_reply_text() -> String {
    "span[data-e2e='comment-level-2']".to_string()
}
fn default_comment_user_root() -> String {
    "[data-e2e='comment-username-1']".to_string()
}
fn default_comment_user_reply() -> String {
    "[data-e2e='comment-username-2']".to_string()
}
fn default_comment_user_anchor() -> String {
    "a".to_string()
}
fn default_comment_user_label() -> String {
    "p".to_string()
}
fn default_comment_like() -> String {
    "div[role='button'][aria-pressed]".to_string()
}
fn default_comment_reveal() -> Vec<String> {
    vec![
        "div[data-e2e='view-more-1']".to_string(),
        "div[data-e2e='view-more-2']".to_string(),
        "span[data-e2e='view-more-1']".to_string(),
    ]
}
fn default_reply_rounds() -> usize {
    8
}
fn default_profile_base() -> String {
    "https://www.tiktok.com".to_string()
}

/// Challenge interstitial selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSelectors {
    /// Element whose presence means an interstitial is blocking the page.
    #[serde(default = "default_challenge_overlay")]
    pub overlay: String,
    /// Close affordance, tried first.
    #[serde(default = "default_challenge_close")]
    pub close: String,
    /// Alternate-challenge-mode affordance, tried after a reload.
    #[serde(default = "default_challenge_alternate")]
    pub alternate: String,
}

impl Default for ChallengeSelectors {
    fn default() -> Self {
        Self {
            overlay: default_challenge_overlay(),
            close: default_challenge_close(),
            alternate: default_challenge_alternate(),
        }
    }
}

fn default_challenge_overlay() -> String {
    "div[id^='captcha'], div[class*='captcha-verify']".to_string()
}
fn default_challenge_close() -> String {
    "div[id^='captcha'] [class*='close'], div[class*='captcha-verify'] [aria-label='Close']"
        .to_string()
}
fn default_challenge_alternate() -> String {
    "div[id^='captcha'] [class*='switch'], div[class*='captcha-verify'] [class*='switch']"
        .to_string()
}

/// One pre-loop dropdown filter: type a value into a filter input, then click
/// the matching option. Applied once before the loop starts, never revisited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownFilter {
    /// Filter input element.
    pub input: String,
    /// Value typed into the input.
    pub value: String,
    /// Option element to click once the dropdown opens.
    pub option: String,
}

/// Pre-loop page preparation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// Elements dismissed best-effort before crawling (banners, prompts).
    #[serde(default)]
    pub dismiss: Vec<String>,
    /// Optional dropdown filter (region, industry).
    #[serde(default)]
    pub filter: Option<DropdownFilter>,
}

/// Complete selector profile for every feed surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectorProfile {
    #[serde(default)]
    pub video: VideoSelectors,
    #[serde(default)]
    pub hashtag: HashtagSelectors,
    #[serde(default)]
    pub audio: AudioSelectors,
    #[serde(default)]
    pub comments: CommentSelectors,
    #[serde(default)]
    pub challenge: ChallengeSelectors,
    #[serde(default)]
    pub prepare: PrepareConfig,
}

impl SelectorProfile {
    /// Load a profile from a JSON file; absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, CrawlError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| CrawlError::Config(format!("invalid profile {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_defaults() {
        let limits: CollectLimits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits.target, 100);
        assert_eq!(limits.max_empty_rounds, 3);
        assert_eq!(limits.max_rounds, 60);
    }

    #[test]
    fn profile_partial_override_keeps_defaults() {
        let json = r#"{
            "hashtag": { "title": "span.custom-title" },
            "comments": { "reply_rounds": 4 }
        }"#;
        let profile: SelectorProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.hashtag.title, "span.custom-title");
        assert_eq!(profile.hashtag.load_more, default_hashtag_load_more());
        assert_eq!(profile.comments.reply_rounds, 4);
        assert_eq!(profile.comments.root_text, "span[data-e2e='comment-level-1']");
        assert_eq!(profile.video, VideoSelectors::default());
    }

    #[test]
    fn dropdown_filter_roundtrip() {
        let json = r#"{
            "prepare": {
                "dismiss": ["div.banner"],
                "filter": { "input": "input[placeholder='Region']", "value": "việt nam", "option": "span.option" }
            }
        }"#;
        let profile: SelectorProfile = serde_json::from_str(json).unwrap();
        let filter = profile.prepare.filter.unwrap();
        assert_eq!(filter.value, "việt nam");
        assert_eq!(profile.prepare.dismiss.len(), 1);
    }
}
