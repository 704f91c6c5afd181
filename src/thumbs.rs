//! Thumbnail collaborator for timeline images.
//!
//! The image store is external: given a specimen's media reference and
//! detection bounding box it returns a cropped, resized, JPEG-encoded
//! thumbnail. A missing image is `Ok(None)` — the timeline degrades that one
//! record's `image` field to null and carries on; transport failures are
//! real errors and abort the response.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::models::SpecimenRecord;

// ---

/// Requested thumbnail edge lengths, in pixels.
pub const THUMB_WIDTH: u32 = 128;
pub const THUMB_HEIGHT: u32 = 128;

// ---

#[async_trait]
pub trait ThumbSource: Send + Sync {
    /// Base64-encoded JPEG thumbnail for the specimen's detection crop, or
    /// `None` when the referenced media no longer exists.
    async fn thumbnail(&self, specimen: &SpecimenRecord) -> Result<Option<String>>;
}

// ---

/// Fetches thumbnails from the image store's HTTP API.
pub struct HttpThumbSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpThumbSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        // ---
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ThumbSource for HttpThumbSource {
    async fn thumbnail(&self, specimen: &SpecimenRecord) -> Result<Option<String>> {
        // ---
        let url = format!(
            "{}/thumbnail/{}?x0={}&y0={}&x1={}&y1={}&w={}&h={}",
            self.base_url,
            specimen.media_id,
            specimen.bbox_ll_x,
            specimen.bbox_ll_y,
            specimen.bbox_ur_x,
            specimen.bbox_ur_y,
            THUMB_WIDTH,
            THUMB_HEIGHT,
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("media {} missing from image store", specimen.media_id);
            return Ok(None);
        }
        let bytes = response.error_for_status()?.bytes().await?;
        Ok(Some(STANDARD.encode(&bytes)))
    }
}

// ---

/// Used when no image store is configured; every image field comes back
/// null rather than failing timeline requests.
pub struct NoThumbs;

#[async_trait]
impl ThumbSource for NoThumbs {
    async fn thumbnail(&self, _specimen: &SpecimenRecord) -> Result<Option<String>> {
        // ---
        Ok(None)
    }
}
