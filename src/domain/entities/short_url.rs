//! Short URL entity and page metadata value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a short URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrlStatus {
    Active,
    Inactive,
    Deleted,
}

impl UrlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Deleted => "DELETED",
        }
    }

    /// Parses the database representation. Unknown values are treated as
    /// `Inactive` so a bad row can never be served.
    pub fn parse(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Active,
            "DELETED" => Self::Deleted,
            _ => Self::Inactive,
        }
    }
}

/// Page metadata extracted by the head-only crawler.
///
/// All fields are absolute URLs or plain text; an empty string means the
/// source page did not provide the value (no guessing, no default icons).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMetadata {
    #[serde(default)]
    pub final_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub favicon: String,
}

/// A shortened URL record.
///
/// `short_code` is the primary key: 7 characters drawn from `[A-Za-z0-9]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortUrl {
    pub short_code: String,
    pub original_url: String,
    pub status: UrlStatus,
    pub metadata: Option<UrlMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShortUrl {
    pub fn is_active(&self) -> bool {
        self.status == UrlStatus::Active
    }
}

/// Input data for creating a new short URL.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub short_code: String,
    pub original_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [UrlStatus::Active, UrlStatus::Inactive, UrlStatus::Deleted] {
            assert_eq!(UrlStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_is_inactive() {
        assert_eq!(UrlStatus::parse("SOMETHING_ELSE"), UrlStatus::Inactive);
    }

    #[test]
    fn test_metadata_defaults_to_empty_fields() {
        let meta: UrlMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(meta, UrlMetadata::default());
    }
}
