//! Third-party video embeds
//!
//! Embedded players cannot work offline; they are replaced by a thumbnail
//! linking to the online video.

use tracing::warn;

use super::rewriter::RewriteError;
use crate::network::Session;
use crate::utils::url::Url;

const VIMEO_OEMBED_ENDPOINT: &str = "https://vimeo.com/api/oembed.json";

/// Source of thumbnails that need a remote lookup.
pub trait ThumbnailResolver {
    fn vimeo_thumbnail_url(&self, video_url: &str) -> Result<String, RewriteError>;
}

impl ThumbnailResolver for Session {
    fn vimeo_thumbnail_url(&self, video_url: &str) -> Result<String, RewriteError> {
        let failure = |reason: String| RewriteError::VimeoThumbnail {
            url: video_url.to_string(),
            reason,
        };

        let endpoint = Url::parse_with_params(VIMEO_OEMBED_ENDPOINT, &[("url", video_url)])
            .map_err(|err| failure(err.to_string()))?;
        let document = self
            .get_json(endpoint.as_str(), &[])
            .map_err(|err| failure(err.to_string()))?;

        match document.get("thumbnail_url").and_then(|value| value.as_str()) {
            Some(thumbnail_url) if !thumbnail_url.is_empty() => Ok(thumbnail_url.to_string()),
            Some(_) => {
                warn!("empty thumbnail_url in response:\n{}", document);
                Err(failure("API response has empty thumbnail_url".to_string()))
            }
            None => {
                warn!("failed to find thumbnail_url in response:\n{}", document);
                Err(failure("API response misses the thumbnail_url".to_string()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoEmbed {
    YouTube { video_id: String },
    Vimeo { video_url: String },
}

impl VideoEmbed {
    /// Recognizes YouTube and Vimeo player URLs.
    pub fn detect(src: &Url) -> Option<VideoEmbed> {
        let host = src.host_str()?.to_lowercase();
        let mut segments = src.path_segments()?.filter(|segment| !segment.is_empty());

        match host.as_str() {
            "youtube.com" | "www.youtube.com" | "m.youtube.com" | "youtube-nocookie.com"
            | "www.youtube-nocookie.com" => {
                if segments.next()? != "embed" {
                    return None;
                }
                let video_id = segments.next()?;
                Some(VideoEmbed::YouTube {
                    video_id: video_id.to_string(),
                })
            }
            "player.vimeo.com" => {
                if segments.next()? != "video" {
                    return None;
                }
                let video_id = segments.next()?;
                video_id
                    .chars()
                    .all(|c| c.is_ascii_digit())
                    .then(|| VideoEmbed::Vimeo {
                        video_url: src.to_string(),
                    })
            }
            "vimeo.com" | "www.vimeo.com" => {
                let video_id = segments.next()?;
                video_id
                    .chars()
                    .all(|c| c.is_ascii_digit())
                    .then(|| VideoEmbed::Vimeo {
                        video_url: src.to_string(),
                    })
            }
            _ => None,
        }
    }

    pub fn thumbnail_url(&self, resolver: &dyn ThumbnailResolver) -> Result<String, RewriteError> {
        match self {
            VideoEmbed::YouTube { video_id } => {
                Ok(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id))
            }
            VideoEmbed::Vimeo { video_url } => resolver.vimeo_thumbnail_url(video_url),
        }
    }
}
