//! Hashtag-tile feed.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{FeedAdapter, FeedRecord};
use crate::config::HashtagSelectors;
use crate::dom::DomSurface;
use crate::error::CrawlError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HashtagRecord {
    pub hashtag: String,
}

impl FeedRecord for HashtagRecord {
    /// Case-insensitive identity: the feed occasionally repaints the same
    /// tag with different casing.
    fn identity_key(&self) -> String {
        self.hashtag.to_lowercase()
    }
}

/// Strip the leading hash mark and surrounding whitespace from a tile title.
/// Returns `None` for titles that are empty once stripped.
pub fn normalize_hashtag(raw: &str) -> Option<String> {
    let name = raw.trim().trim_start_matches('#').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

pub struct HashtagAdapter {
    surface: Arc<dyn DomSurface>,
    selectors: HashtagSelectors,
}

impl HashtagAdapter {
    pub fn new(surface: Arc<dyn DomSurface>, selectors: HashtagSelectors) -> Self {
        Self { surface, selectors }
    }
}

#[async_trait]
impl FeedAdapter for HashtagAdapter {
    type Item = HashtagRecord;

    async fn extract(&self) -> Result<Vec<HashtagRecord>, CrawlError> {
        let titles = self.surface.texts(&self.selectors.title).await?;
        Ok(titles
            .iter()
            .filter_map(|t| normalize_hashtag(t))
            .map(|hashtag| HashtagRecord { hashtag })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::mock::MockSurface;

    #[test]
    fn normalization_strips_hash_and_whitespace() {
        assert_eq!(normalize_hashtag("# fyp "), Some("fyp".to_string()));
        assert_eq!(normalize_hashtag("#xuhuong"), Some("xuhuong".to_string()));
        assert_eq!(normalize_hashtag("plain"), Some("plain".to_string()));
        assert_eq!(normalize_hashtag("  # "), None);
        assert_eq!(normalize_hashtag(""), None);
    }

    #[test]
    fn identity_ignores_case() {
        let a = HashtagRecord { hashtag: "FYP".into() };
        let b = HashtagRecord { hashtag: "fyp".into() };
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[tokio::test]
    async fn extracts_normalized_titles() {
        let mock = Arc::new(MockSurface::new());
        let selectors = HashtagSelectors::default();
        mock.push_texts(&selectors.title, &["# trend1", "#trend2", "   "]);

        let adapter = HashtagAdapter::new(mock, selectors);
        let records = adapter.extract().await.unwrap();
        let tags: Vec<&str> = records.iter().map(|r| r.hashtag.as_str()).collect();
        assert_eq!(tags, ["trend1", "trend2"]);
    }
}
