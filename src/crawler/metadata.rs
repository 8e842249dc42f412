//! Payloads of the metadata and engagement endpoints
//!
//! The metadata endpoint answers with an album document listing every video
//! variant of the playlist. The vote endpoint answers with a JSON object
//! wrapped in one character on each side (a JSONP-style callback wrapper).
//!
//! Both services are loose about types: ids come back as numbers or strings
//! and people lists as plain names or `{ "name": ... }` objects, so the models
//! below accept either.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Album-level metadata for a playlist
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumMetadata {
    #[serde(default, deserialize_with = "names")]
    pub actors: Vec<String>,

    #[serde(default, deserialize_with = "names")]
    pub directors: Vec<String>,

    #[serde(default, deserialize_with = "names")]
    pub categories: Vec<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub tv_english_name: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub large_ver_pic_url: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub album_page_url: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub default_page_url: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub pid: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub album_name: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub album_desc: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub update_time: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub publish_year: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub area: Option<String>,

    #[serde(default)]
    pub videos: Vec<VideoVariant>,
}

/// One playable variant (episode, trailer, ...) of an album
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoVariant {
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub page_url: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub play_length: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub large_pic_url: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub publish_time: Option<String>,
}

impl AlbumMetadata {
    /// Picks the variant describing the item at `page_url`
    ///
    /// A playlist with a single variant is unambiguous. Otherwise the variant
    /// whose page URL equals the item link is chosen.
    pub fn select_variant(&self, page_url: &str) -> Option<&VideoVariant> {
        if let [only] = self.videos.as_slice() {
            return Some(only);
        }

        self.videos
            .iter()
            .find(|video| video.page_url.as_deref() == Some(page_url))
    }
}

/// Engagement counts for one video
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounts {
    #[serde(deserialize_with = "count")]
    pub up_count: u64,

    #[serde(deserialize_with = "count")]
    pub down_count: u64,
}

/// Parses a metadata response body
pub fn parse_metadata(body: &str) -> Result<AlbumMetadata, serde_json::Error> {
    serde_json::from_str(body)
}

/// Parses a vote response body
///
/// The body is trimmed, then its first and last characters (the callback
/// wrapper) are dropped before decoding.
///
/// # Example
///
/// ```
/// use reel_harvest::crawler::parse_vote_counts;
///
/// let votes = parse_vote_counts(r#"({"downCount":3,"upCount":10})"#).unwrap();
/// assert_eq!(votes.up_count, 10);
/// assert_eq!(votes.down_count, 3);
/// ```
pub fn parse_vote_counts(body: &str) -> Result<VoteCounts, String> {
    let body = body.trim();

    let mut chars = body.chars();
    if chars.next().is_none() || chars.next_back().is_none() {
        return Err(format!("response too short to unwrap: {:?}", body));
    }

    serde_json::from_str(chars.as_str()).map_err(|e| e.to_string())
}

fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    })
}

fn names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn name_of(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(mut map) => match map.remove("name") {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values.into_iter().filter_map(name_of).collect(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::Null => Vec::new(),
        value => name_of(value).into_iter().collect(),
    })
}

fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("invalid count {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid count {:?}", s))),
        other => Err(de::Error::custom(format!("invalid count {}", other))),
    }
}
