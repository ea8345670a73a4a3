//! Device Registration Model

use serde::{Deserialize, Serialize};

/// Push provider a device token was issued by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PushProviderKind {
    #[serde(rename = "fcm")]
    Fcm,
    #[serde(rename = "apns")]
    Apns,
    #[serde(rename = "webpush")]
    WebPush,
}

impl PushProviderKind {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "fcm" => Some(Self::Fcm),
            "apns" => Some(Self::Apns),
            "webpush" => Some(Self::WebPush),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Fcm => "fcm",
            Self::Apns => "apns",
            Self::WebPush => "webpush",
        }
    }
}

/// Client platform of a registered device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePlatform {
    Ios,
    Android,
    Web,
}

impl DevicePlatform {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            "web" => Some(Self::Web),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Web => "web",
        }
    }
}

/// Push-capable endpoint bound to a user. `token` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub id: i64,
    pub user_id: String,
    pub token: String,
    pub provider: PushProviderKind,
    pub platform: DevicePlatform,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_wire_names() {
        assert_eq!(
            serde_json::to_string(&PushProviderKind::WebPush).unwrap(),
            "\"webpush\""
        );
        let p: PushProviderKind = serde_json::from_str("\"fcm\"").unwrap();
        assert_eq!(p, PushProviderKind::Fcm);
        assert_eq!(PushProviderKind::from_db("apns"), Some(PushProviderKind::Apns));
    }

    #[test]
    fn test_platform_db_roundtrip() {
        for s in ["ios", "android", "web"] {
            assert_eq!(DevicePlatform::from_db(s).unwrap().as_db(), s);
        }
    }
}
