//! Class (bookable subject) and Profile Models

use serde::{Deserialize, Serialize};

/// Publication state of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    Draft,
    Open,
    Closed,
    Cancelled,
}

impl ClassStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Public profile of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// A bookable class, coach already flattened to one profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSubject {
    pub id: i64,
    pub title: String,
    /// Smallest currency unit
    pub price: i64,
    pub status: ClassStatus,
    /// Managing party notified about bookings
    pub coach_id: String,
    pub coach: Option<Profile>,
}

impl ClassSubject {
    pub fn is_bookable(&self) -> bool {
        self.status == ClassStatus::Open
    }
}
