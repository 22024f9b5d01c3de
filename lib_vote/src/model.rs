//! # Catalog Model
//!
//! Wire and domain types for catalog items and votes, and the
//! `CatalogClient` trait the store talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RemoteError;

/// Public endpoint of the catalog service.
pub const DEFAULT_BASE_URL: &str = "https://api.thecatapi.com/v1/";

/// A catalog entry available for voting. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Catalog id, the item's identity.
    pub id: String,
    /// Where the image can be loaded from.
    #[serde(rename = "url")]
    pub source_url: String,
    /// Pixel width.
    pub width: i64,
    /// Pixel height.
    pub height: i64,
}

/// Sign of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Direction {
    /// +1, favorable.
    Up,
    /// -1, unfavorable.
    Down,
}

impl Direction {
    /// The signed value added to an item's score.
    pub fn value(self) -> i64 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

impl TryFrom<i64> for Direction {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Up),
            -1 => Ok(Direction::Down),
            other => Err(format!("vote direction must be 1 or -1, got {}", other)),
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Direction::try_from(i64::from(value))
    }
}

impl From<Direction> for i64 {
    fn from(direction: Direction) -> Self {
        direction.value()
    }
}

/// UI color scheme. Not part of the voting logic, but persisted alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light scheme (default).
    #[default]
    Light,
    /// Dark scheme.
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Which operation produced the last recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedAction {
    /// Batch fetch.
    Fetch,
    /// Vote submission.
    Vote,
}

/// Body of `POST /votes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRequest {
    /// Item being voted on.
    pub image_id: String,
    /// Voter identity.
    pub sub_id: String,
    /// +1 or -1.
    pub value: Direction,
}

/// Acknowledgment returned by a successful vote submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteAck {
    /// Server-assigned vote id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Server status message, usually "SUCCESS".
    #[serde(default)]
    pub message: Option<String>,
    /// Echoed item id.
    #[serde(default)]
    pub image_id: Option<String>,
    /// Echoed vote value.
    #[serde(default)]
    pub value: Option<i64>,
}

/// A vote as recorded by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVote {
    /// Server-assigned vote id.
    pub id: i64,
    /// Item voted on.
    pub image_id: String,
    /// Voter identity.
    pub sub_id: String,
    /// Raw vote value as stored remotely.
    pub value: i64,
    /// Server timestamp.
    pub created_at: String,
}

/// # Catalog Client
///
/// The two remote operations the store depends on, plus the vote history
/// query. Implementations translate transport failures into `RemoteError`
/// and never retry on their own unless configured to.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch a batch of up to `limit` items.
    async fn fetch_batch(&self, limit: u32) -> Result<Vec<Item>, RemoteError>;

    /// Submit one vote for `item_id` attributed to `identity`.
    async fn submit_vote(
        &self,
        item_id: &str,
        identity: &str,
        direction: Direction,
    ) -> Result<VoteAck, RemoteError>;

    /// List the votes recorded remotely for `identity`.
    async fn fetch_votes(&self, identity: &str) -> Result<Vec<RemoteVote>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_reads_wire_shape_and_ignores_extra_fields() {
        let raw = r#"{"id":"abc","url":"https://cdn/abc.jpg","width":640,"height":480,"breeds":[]}"#;
        let item: Item = serde_json::from_str(raw).unwrap();
        assert_eq!(item.id, "abc");
        assert_eq!(item.source_url, "https://cdn/abc.jpg");
        assert_eq!((item.width, item.height), (640, 480));
    }

    #[test]
    fn direction_only_accepts_unit_values() {
        assert_eq!(Direction::try_from(1i64), Ok(Direction::Up));
        assert_eq!(Direction::try_from(-1i8), Ok(Direction::Down));
        assert!(Direction::try_from(0i64).is_err());
        assert!(serde_json::from_str::<Direction>("2").is_err());
        assert_eq!(serde_json::to_string(&Direction::Down).unwrap(), "-1");
    }

    #[test]
    fn vote_request_serializes_value_as_integer() {
        let req = VoteRequest {
            image_id: "x".into(),
            sub_id: "user_1".into(),
            value: Direction::Up,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v, serde_json::json!({"image_id": "x", "sub_id": "user_1", "value": 1}));
    }

    #[test]
    fn theme_toggles_and_serializes_lowercase() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }
}
