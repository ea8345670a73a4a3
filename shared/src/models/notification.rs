//! Notification Model

use serde::{Deserialize, Serialize};

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Chat,
    Comment,
    Reservation,
    Order,
    Review,
    System,
}

impl NotificationKind {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(Self::Chat),
            "comment" => Some(Self::Comment),
            "reservation" => Some(Self::Reservation),
            "order" => Some(Self::Order),
            "review" => Some(Self::Review),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Comment => "comment",
            Self::Reservation => "reservation",
            Self::Order => "order",
            Self::Review => "review",
            Self::System => "system",
        }
    }
}

/// Notification entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: String,
    pub actor_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub deep_link: Option<String>,
    pub dedupe_key: Option<String>,
    pub is_read: bool,
    pub created_at: i64,
}

/// Insert payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCreate {
    pub recipient_id: String,
    pub actor_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub deep_link: Option<String>,
    pub dedupe_key: Option<String>,
}
