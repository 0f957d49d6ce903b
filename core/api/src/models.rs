//! Data API resource shapes.

use serde::{Deserialize, Serialize};
use tubeup_common::PrivacyStatus;

/// Watch URL prefix for uploaded videos.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Build the canonical watch URL for a video.
pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL_PREFIX, video_id)
}

/// Metadata body sent when opening an upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResource {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

impl VideoResource {
    /// Value for the `part` query parameter matching this body.
    pub fn parts(&self) -> &'static str {
        "snippet,status"
    }
}

/// Descriptive part of a video resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Omitted from the body entirely when no keywords were given.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub category_id: String,
}

/// Publication settings of a video resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: PrivacyStatus,
    #[serde(default)]
    pub self_declared_made_for_kids: bool,
}

/// Envelope of every `list` call.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Channel owned by the authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: Option<ChannelStatistics>,
}

impl Channel {
    /// Subscriber count, `None` when hidden or not returned.
    pub fn subscriber_count(&self) -> Option<&str> {
        self.statistics
            .as_ref()
            .filter(|s| !s.hidden_subscriber_count)
            .and_then(|s| s.subscriber_count.as_deref())
    }

    /// Number of public videos, if returned.
    pub fn video_count(&self) -> Option<&str> {
        self.statistics
            .as_ref()
            .and_then(|s| s.video_count.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
}

/// Counters are returned as decimal strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    #[serde(default)]
    pub subscriber_count: Option<String>,
    #[serde(default)]
    pub video_count: Option<String>,
    #[serde(default)]
    pub hidden_subscriber_count: bool,
}

/// Category a video can be filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCategory {
    pub id: String,
    pub snippet: VideoCategorySnippet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCategorySnippet {
    pub title: String,
    #[serde(default)]
    pub assignable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(tags: Vec<String>) -> VideoResource {
        VideoResource {
            snippet: VideoSnippet {
                title: "Trip".to_string(),
                description: "Mountains".to_string(),
                tags,
                category_id: "22".to_string(),
            },
            status: VideoStatus {
                privacy_status: PrivacyStatus::Unlisted,
                self_declared_made_for_kids: false,
            },
        }
    }

    #[test]
    fn test_video_resource_wire_format() {
        let value = serde_json::to_value(resource(vec!["a".to_string(), "b".to_string()])).unwrap();

        assert_eq!(value["snippet"]["categoryId"], "22");
        assert_eq!(value["snippet"]["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(value["status"]["privacyStatus"], "unlisted");
        assert_eq!(value["status"]["selfDeclaredMadeForKids"], false);
    }

    #[test]
    fn test_empty_tags_omitted() {
        let value = serde_json::to_value(resource(Vec::new())).unwrap();
        assert!(value["snippet"].get("tags").is_none());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_channel_statistics() {
        let json = r#"{
            "id": "UC1",
            "snippet": {"title": "Home Videos"},
            "statistics": {"subscriberCount": "42", "videoCount": "7", "hiddenSubscriberCount": false}
        }"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.subscriber_count(), Some("42"));
        assert_eq!(channel.video_count(), Some("7"));

        let hidden = r#"{
            "id": "UC2",
            "snippet": {"title": "Quiet"},
            "statistics": {"subscriberCount": "0", "hiddenSubscriberCount": true}
        }"#;
        let channel: Channel = serde_json::from_str(hidden).unwrap();
        assert_eq!(channel.subscriber_count(), None);
        assert_eq!(channel.video_count(), None);
    }

    #[test]
    fn test_category_list_parsing() {
        let json = r#"{"kind": "youtube#videoCategoryListResponse", "items": [
            {"id": "1", "snippet": {"title": "Film & Animation", "assignable": true}},
            {"id": "18", "snippet": {"title": "Short Movies", "assignable": false}}
        ]}"#;
        let list: ListResponse<VideoCategory> = serde_json::from_str(json).unwrap();
        assert_eq!(list.items.len(), 2);
        assert!(list.items[0].snippet.assignable);
        assert!(!list.items[1].snippet.assignable);
    }

    #[test]
    fn test_list_without_items() {
        let list: ListResponse<Channel> = serde_json::from_str(r#"{"kind": "youtube#channelListResponse"}"#).unwrap();
        assert!(list.items.is_empty());
    }
}
