use async_trait::async_trait;
use serde::Deserialize;

use super::search::{MediaSearch, SearchError, SearchHit, SearchRequest};
use crate::reel::config::SearchConfig;
use crate::reel::types::MediaKind;

const USER_AGENT: &str = concat!("scriptreel/", env!("CARGO_PKG_VERSION"));

/// Pexels client for the video and photo search endpoints.
pub struct PexelsClient {
    client: reqwest::Client,
    api_key: String,
    video_endpoint: String,
    photo_endpoint: String,
}

impl PexelsClient {
    pub fn new(config: &SearchConfig, api_key: &str) -> Result<Self, SearchError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SearchError::MissingApiKey);
        }

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            video_endpoint: config.video_endpoint.clone(),
            photo_endpoint: config.photo_endpoint.clone(),
        })
    }

    fn endpoint(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Video => &self.video_endpoint,
            MediaKind::Image => &self.photo_endpoint,
        }
    }
}

#[async_trait]
impl MediaSearch for PexelsClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        let per_page = request.per_page.clamp(1, 80).to_string();
        let page = request.page.max(1).to_string();

        let response = self
            .client
            .get(self.endpoint(request.kind))
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", request.query.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
                ("orientation", request.orientation.provider_value()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let hits = match request.kind {
            MediaKind::Video => response
                .json::<VideoPage>()
                .await?
                .videos
                .into_iter()
                .filter_map(PexelsVideo::into_hit)
                .collect(),
            MediaKind::Image => response
                .json::<PhotoPage>()
                .await?
                .photos
                .into_iter()
                .map(PexelsPhoto::into_hit)
                .collect(),
        };
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct VideoPage {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    video_files: Vec<PexelsVideoFile>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideoFile {
    link: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    file_type: Option<String>,
}

impl PexelsVideo {
    /// The first mp4 rendition stands for the whole clip
    fn into_hit(self) -> Option<SearchHit> {
        let file = self
            .video_files
            .iter()
            .find(|file| file.file_type.as_deref().is_none_or(|t| t == "video/mp4"))
            .or_else(|| self.video_files.first())?;

        Some(SearchHit {
            url: file.link.clone(),
            width: file.width.unwrap_or(0),
            height: file.height.unwrap_or(0),
            duration: self.duration,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PhotoPage {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    width: u32,
    height: u32,
    src: PhotoSources,
    #[serde(default)]
    alt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    original: String,
}

impl PexelsPhoto {
    fn into_hit(self) -> SearchHit {
        SearchHit {
            url: self.src.original,
            width: self.width,
            height: self.height,
            duration: None,
            tags: self.alt.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_page_maps_first_mp4_rendition() {
        let json = r#"{
            "page": 1,
            "videos": [{
                "id": 1,
                "duration": 12,
                "video_files": [
                    {"link": "https://x/a.webm", "width": 1280, "height": 720, "file_type": "video/webm"},
                    {"link": "https://x/a.mp4", "width": 1920, "height": 1080, "file_type": "video/mp4"}
                ]
            }, {
                "id": 2,
                "duration": 5,
                "video_files": []
            }]
        }"#;

        let page: VideoPage = serde_json::from_str(json).unwrap();
        let hits: Vec<SearchHit> = page
            .videos
            .into_iter()
            .filter_map(PexelsVideo::into_hit)
            .collect();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://x/a.mp4");
        assert_eq!((hits[0].width, hits[0].height), (1920, 1080));
        assert_eq!(hits[0].duration, Some(12.0));
    }

    #[test]
    fn photo_page_uses_original_source() {
        let json = r#"{
            "photos": [{
                "id": 7,
                "width": 4000,
                "height": 6000,
                "alt": "Mountain lake",
                "src": {"original": "https://x/p.jpeg", "large": "https://x/p-large.jpeg"}
            }]
        }"#;

        let page: PhotoPage = serde_json::from_str(json).unwrap();
        let hit = page.photos.into_iter().next().unwrap().into_hit();

        assert_eq!(hit.url, "https://x/p.jpeg");
        assert_eq!(hit.duration, None);
        assert_eq!(hit.tags, vec!["Mountain lake".to_string()]);
    }

    #[test]
    fn blank_key_is_rejected() {
        let result = PexelsClient::new(&SearchConfig::default(), "  ");
        assert!(matches!(result, Err(SearchError::MissingApiKey)));
    }
}
