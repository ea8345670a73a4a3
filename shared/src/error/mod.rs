//! Unified error system for Piste
//!
//! This module provides a comprehensive error handling system with:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ErrorBody`]: JSON body of every error response
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Class errors
//! - 5xxx: Payment errors
//! - 6xxx: Notification / device errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorBody, ErrorCode};
//!
//! // Create a simple error
//! let err = AppError::new(ErrorCode::PaymentNotFound);
//!
//! // Create an error with details
//! let err = AppError::new(ErrorCode::PaymentAmountMismatch)
//!     .with_detail("expected", 50000);
//!
//! // Convert to the wire body
//! let body = ErrorBody::from(&err);
//! assert_eq!(body.code, 5002);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, ErrorBody};
