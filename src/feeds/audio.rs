//! Audio-tile feed.
//!
//! Tiles link to a detail page whose href carries a `song/<name>-<id>`
//! segment, percent-encoded. The public music URL is rebuilt from the
//! decoded name and numeric id; tiles whose href lacks a numeric id keep
//! their name but get no URL.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{FeedAdapter, FeedRecord};
use crate::config::AudioSelectors;
use crate::dom::DomSurface;
use crate::error::CrawlError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioRecord {
    /// Reconstructed public track page, absent when the id is missing.
    pub audio_url: Option<String>,
    pub song_name: String,
    pub song_id: Option<String>,
}

impl FeedRecord for AudioRecord {
    /// The numeric id when present; the name otherwise. Renamed re-uploads
    /// of the same track share an id and must collapse.
    fn identity_key(&self) -> String {
        self.song_id.clone().unwrap_or_else(|| self.song_name.clone())
    }
}

/// Parse the `song/<name>-<id>` segment out of a detail href.
///
/// Returns the decoded name and, when the trailing segment is numeric, the
/// id. `None` when the href has no song segment at all.
pub fn parse_song_href(href: &str) -> Option<(String, Option<String>)> {
    let part = href.split_once("song/")?.1;
    let part = part.split('?').next().unwrap_or(part);
    let decoded = urlencoding::decode(part).map(|c| c.into_owned()).ok()?;

    match decoded.rsplit_once('-') {
        Some((name, id)) if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) => {
            Some((name.to_string(), Some(id.to_string())))
        }
        _ => Some((decoded, None)),
    }
}

pub struct AudioAdapter {
    surface: Arc<dyn DomSurface>,
    selectors: AudioSelectors,
}

impl AudioAdapter {
    pub fn new(surface: Arc<dyn DomSurface>, selectors: AudioSelectors) -> Self {
        Self { surface, selectors }
    }
}

#[async_trait]
impl FeedAdapter for AudioAdapter {
    type Item = AudioRecord;

    async fn extract(&self) -> Result<Vec<AudioRecord>, CrawlError> {
        let hrefs = self
            .surface
            .attrs(&self.selectors.detail_link, "href")
            .await?;

        Ok(hrefs
            .iter()
            .filter_map(|href| parse_song_href(href))
            .map(|(song_name, song_id)| AudioRecord {
                audio_url: song_id
                    .as_ref()
                    .map(|id| format!("{}{}-{}", self.selectors.music_base_url, song_name, id)),
                song_name,
                song_id,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::mock::MockSurface;

    #[test]
    fn href_with_numeric_id() {
        let (name, id) = parse_song_href("/song/Nang-Tho-7123456789?region=VN").unwrap();
        assert_eq!(name, "Nang-Tho");
        assert_eq!(id.as_deref(), Some("7123456789"));
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let (name, id) = parse_song_href("/song/n%E1%BA%AFng%20th%C6%A1-42").unwrap();
        assert_eq!(name, "nắng thơ");
        assert_eq!(id.as_deref(), Some("42"));
    }

    #[test]
    fn non_numeric_tail_keeps_full_name() {
        let (name, id) = parse_song_href("/song/original-sound").unwrap();
        assert_eq!(name, "original-sound");
        assert!(id.is_none());
    }

    #[test]
    fn href_without_song_segment() {
        assert!(parse_song_href("/creativecenter/music/pc").is_none());
    }

    #[tokio::test]
    async fn extraction_rebuilds_public_urls() {
        let mock = Arc::new(MockSurface::new());
        let selectors = AudioSelectors::default();
        mock.push_attrs(
            &selectors.detail_link,
            &["/song/Hit-Song-99?x=1", "/song/no-id-here", "/other/path"],
        );

        let adapter = AudioAdapter::new(mock, selectors);
        let records = adapter.extract().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].audio_url.as_deref(),
            Some("https://www.tiktok.com/music/Hit-Song-99")
        );
        assert_eq!(records[1].song_name, "no-id-here");
        assert!(records[1].audio_url.is_none());
    }
}
