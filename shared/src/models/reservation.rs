//! Reservation Model

use serde::{Deserialize, Serialize};

/// Booking lifecycle of a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Requested,
    Confirmed,
    Cancelled,
}

impl LifecycleStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(Self::Requested),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Payment side of a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A user's attempt to book a priced class
///
/// `payment_status == Paid` holds exactly when `status == Confirmed` for
/// priced reservations. Free reservations are confirmed and paid at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationIntent {
    pub id: i64,
    pub class_id: i64,
    pub user_id: String,
    pub status: LifecycleStatus,
    pub payment_status: PaymentStatus,
    /// Smallest currency unit
    pub amount: i64,
    /// Latest order id allocated for this reservation
    pub order_id: Option<String>,
    pub confirmed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ReservationIntent {
    /// Confirmed and paid; checkout short-circuits on this
    pub fn is_settled(&self) -> bool {
        self.status == LifecycleStatus::Confirmed && self.payment_status == PaymentStatus::Paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_roundtrip() {
        for s in ["requested", "confirmed", "cancelled"] {
            assert_eq!(LifecycleStatus::from_db(s).unwrap().as_db(), s);
        }
        for s in ["pending", "paid", "failed", "cancelled"] {
            assert_eq!(PaymentStatus::from_db(s).unwrap().as_db(), s);
        }
        assert!(PaymentStatus::from_db("PAID").is_none());
    }

    #[test]
    fn test_is_settled() {
        let mut r = ReservationIntent {
            id: 1,
            class_id: 7,
            user_id: "u1".into(),
            status: LifecycleStatus::Requested,
            payment_status: PaymentStatus::Pending,
            amount: 50000,
            order_id: None,
            confirmed_at: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(!r.is_settled());
        r.status = LifecycleStatus::Confirmed;
        assert!(!r.is_settled());
        r.payment_status = PaymentStatus::Paid;
        assert!(r.is_settled());
    }
}
