//! Video-card feed.
//!
//! Cards embed the stable video id in a data attribute; the public URL is
//! reconstructed from a template since the card itself links through a
//! tracking redirect.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{FeedAdapter, FeedRecord};
use crate::config::VideoSelectors;
use crate::dom::DomSurface;
use crate::error::CrawlError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub url: String,
}

impl FeedRecord for VideoRecord {
    fn identity_key(&self) -> String {
        self.video_id.clone()
    }
}

pub struct VideoAdapter {
    surface: Arc<dyn DomSurface>,
    selectors: VideoSelectors,
}

impl VideoAdapter {
    pub fn new(surface: Arc<dyn DomSurface>, selectors: VideoSelectors) -> Self {
        Self { surface, selectors }
    }
}

#[async_trait]
impl FeedAdapter for VideoAdapter {
    type Item = VideoRecord;

    async fn extract(&self) -> Result<Vec<VideoRecord>, CrawlError> {
        let ids = self
            .surface
            .attrs(&self.selectors.card, &self.selectors.id_attr)
            .await?;

        Ok(ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .map(|id| VideoRecord {
                url: self.selectors.url_template.replace("{id}", &id),
                video_id: id,
            })
            .collect())
    }
}
