use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::ItemDescriptor;

/// Item metadata returned by `/sharing/rest/content/items/{id}?f=json`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemResponse {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub size: Option<i64>,
}

impl From<ItemResponse> for ItemDescriptor {
    fn from(item: ItemResponse) -> Self {
        Self {
            id: item.id,
            title: item.title,
            modified: item.modified,
            // The portal reports -1 when the size is unknown
            size: item.size.and_then(|s| u64::try_from(s).ok()),
        }
    }
}

/// The portal answers failures with HTTP 200 and an `error` object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// How requests to the portal are authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    None,
    Token {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
}

/// Configuration for the portal client
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub portal_url: Url,
    pub item_id: String,
    pub auth: AuthMode,
    pub timeout: Duration,
    pub probe_timeout: Duration,
}

impl PortalConfig {
    pub fn new(portal_url: Url, item_id: impl Into<String>) -> Self {
        Self {
            portal_url,
            item_id: item_id.into(),
            auth: AuthMode::None,
            timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_response_parses_epoch_millis() {
        let json = r#"{"id":"3e6e4d1c","title":"Offline Mapbook","modified":1500000000000,"size":2048,"type":"Mobile Map Package"}"#;
        let item: ItemResponse = serde_json::from_str(json).unwrap();
        let descriptor = ItemDescriptor::from(item);

        assert_eq!(descriptor.id, "3e6e4d1c");
        assert_eq!(
            descriptor.modified,
            Utc.with_ymd_and_hms(2017, 7, 14, 2, 40, 0).unwrap()
        );
        assert_eq!(descriptor.size, Some(2048));
    }

    #[test]
    fn test_unknown_size_is_dropped() {
        let json = r#"{"id":"x","modified":0,"size":-1}"#;
        let item: ItemResponse = serde_json::from_str(json).unwrap();
        assert_eq!(ItemDescriptor::from(item).size, None);
    }

    #[test]
    fn test_auth_mode_serialization() {
        let auth = AuthMode::Token {
            token: "secret".to_string(),
        };
        let json = serde_json::to_string(&auth).unwrap();
        assert_eq!(json, r#"{"type":"token","token":"secret"}"#);

        let none: AuthMode = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(none, AuthMode::None);
    }
}
