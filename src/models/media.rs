use serde::{Deserialize, Serialize};
use url::Url;

/// An entry of an item's media gallery.
///
/// Older documents stored bare strings; those are read back as images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", from = "RawMedia")]
pub enum MediaEntry {
    Image { url: String },
    Video { url: String },
}

impl MediaEntry {
    pub fn url(&self) -> &str {
        match self {
            MediaEntry::Image { url } | MediaEntry::Video { url } => url,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMedia {
    Legacy(String),
    Tagged(TaggedMedia),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedMedia {
    Image { url: String },
    Video { url: String },
}

impl From<RawMedia> for MediaEntry {
    fn from(raw: RawMedia) -> Self {
        match raw {
            RawMedia::Legacy(url) => MediaEntry::Image { url },
            RawMedia::Tagged(TaggedMedia::Image { url }) => MediaEntry::Image { url },
            RawMedia::Tagged(TaggedMedia::Video { url }) => MediaEntry::Video { url },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailerProvider {
    YouTube { video_id: String },
    Vimeo { video_id: String },
    RuTube { video_id: String },
    Other,
}

/// A validated trailer URL together with the provider it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailerLink {
    pub url: Url,
    pub provider: TrailerProvider,
}

impl TrailerLink {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw.trim())?;
        let provider = detect_provider(&url);
        Ok(Self { url, provider })
    }

    /// URL suitable for an embedded player, when the provider supports one.
    pub fn embed_url(&self) -> Option<String> {
        match &self.provider {
            TrailerProvider::YouTube { video_id } => {
                Some(format!("https://www.youtube.com/embed/{}", video_id))
            }
            TrailerProvider::Vimeo { video_id } => {
                Some(format!("https://player.vimeo.com/video/{}", video_id))
            }
            TrailerProvider::RuTube { video_id } => {
                Some(format!("https://rutube.ru/play/embed/{}", video_id))
            }
            TrailerProvider::Other => None,
        }
    }
}

const YOUTUBE_ID_LEN: usize = 11;

fn detect_provider(url: &Url) -> TrailerProvider {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if host == "youtu.be" || host.ends_with("youtube.com") {
        let candidate = if host == "youtu.be" {
            segments.first().map(|s| s.to_string())
        } else {
            url.query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
                .or_else(|| match segments.as_slice() {
                    ["embed", id, ..] | ["v", id, ..] => Some(id.to_string()),
                    _ => None,
                })
        };
        return match candidate {
            Some(video_id) if video_id.len() == YOUTUBE_ID_LEN => {
                TrailerProvider::YouTube { video_id }
            }
            _ => TrailerProvider::Other,
        };
    }

    if host.ends_with("vimeo.com") {
        if let Some(id) = segments
            .iter()
            .find(|s| s.chars().all(|c| c.is_ascii_digit()))
        {
            return TrailerProvider::Vimeo {
                video_id: id.to_string(),
            };
        }
    }

    if host.ends_with("rutube.ru") {
        if let ["video", id, ..] = segments.as_slice() {
            if id.chars().all(|c| c.is_ascii_alphanumeric()) {
                return TrailerProvider::RuTube {
                    video_id: id.to_string(),
                };
            }
        }
    }

    TrailerProvider::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_serializes_as_tagged_object() {
        let entry = MediaEntry::Video { url: "https://v/1".into() };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"type": "video", "url": "https://v/1"})
        );
    }

    #[test]
    fn youtube_links_resolve_to_embed() {
        for raw in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ] {
            let link = TrailerLink::parse(raw).unwrap();
            assert_eq!(
                link.embed_url().as_deref(),
                Some("https://www.youtube.com/embed/dQw4w9WgXcQ"),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn short_youtube_ids_are_not_embedded() {
        let link = TrailerLink::parse("https://www.youtube.com/watch?v=short").unwrap();
        assert_eq!(link.provider, TrailerProvider::Other);
    }

    #[test]
    fn vimeo_and_rutube_links_resolve_to_embed() {
        let vimeo = TrailerLink::parse("https://vimeo.com/76979871").unwrap();
        assert_eq!(
            vimeo.embed_url().as_deref(),
            Some("https://player.vimeo.com/video/76979871")
        );

        let rutube = TrailerLink::parse("https://rutube.ru/video/abc123def/").unwrap();
        assert_eq!(
            rutube.embed_url().as_deref(),
            Some("https://rutube.ru/play/embed/abc123def")
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(TrailerLink::parse("not a url").is_err());
    }
}
