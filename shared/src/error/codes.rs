//! Unified error codes for Piste
//!
//! Error codes are shared by piste-cloud and the mobile/web clients.
//! They are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Class errors
//! - 5xxx: Payment errors
//! - 6xxx: Notification / device errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, Dart)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Resource belongs to another user
    NotOwner = 2002,

    // ==================== 4xxx: Class ====================
    /// Class not found
    ClassNotFound = 4001,
    /// Class is not open for booking
    ClassNotBookable = 4002,
    /// Class has an invalid price
    ClassInvalidPrice = 4003,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed (gateway rejected the payment)
    PaymentFailed = 5001,
    /// Claimed amount does not match the ledger amount
    PaymentAmountMismatch = 5002,
    /// Payment order not found
    PaymentNotFound = 5003,
    /// Payment gateway credentials are not configured
    PaymentSetupFailed = 5004,
    /// Payment gateway could not be reached
    PaymentGatewayError = 5005,
    /// Webhook signature / secret verification failed
    WebhookSignatureInvalid = 5006,

    // ==================== 6xxx: Notification / Device ====================
    /// Notification not found
    NotificationNotFound = 6001,
    /// Device token is invalid
    DeviceTokenInvalid = 6101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::NotOwner => "Resource belongs to another user",

            // Class
            ErrorCode::ClassNotFound => "Class not found",
            ErrorCode::ClassNotBookable => "Class is not open for booking",
            ErrorCode::ClassInvalidPrice => "Class has an invalid price",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::PaymentAmountMismatch => "Payment amount does not match the order",
            ErrorCode::PaymentNotFound => "Payment order not found",
            ErrorCode::PaymentSetupFailed => "Payment gateway is not configured",
            ErrorCode::PaymentGatewayError => "Payment gateway is unavailable",
            ErrorCode::WebhookSignatureInvalid => "Webhook verification failed",

            // Notification / Device
            ErrorCode::NotificationNotFound => "Notification not found",
            ErrorCode::DeviceTokenInvalid => "Device token is invalid",

            // System
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2002 => Ok(ErrorCode::NotOwner),

            // Class
            4001 => Ok(ErrorCode::ClassNotFound),
            4002 => Ok(ErrorCode::ClassNotBookable),
            4003 => Ok(ErrorCode::ClassInvalidPrice),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentAmountMismatch),
            5003 => Ok(ErrorCode::PaymentNotFound),
            5004 => Ok(ErrorCode::PaymentSetupFailed),
            5005 => Ok(ErrorCode::PaymentGatewayError),
            5006 => Ok(ErrorCode::WebhookSignatureInvalid),

            // Notification / Device
            6001 => Ok(ErrorCode::NotificationNotFound),
            6101 => Ok(ErrorCode::DeviceTokenInvalid),

            // System
            9001 => Ok(ErrorCode::InternalError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
