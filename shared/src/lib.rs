//! Shared types for Piste
//!
//! Domain models, wire DTOs and the unified error system used by
//! piste-cloud and its clients. No I/O lives here.

pub mod error;
pub mod models;
pub mod payment;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
