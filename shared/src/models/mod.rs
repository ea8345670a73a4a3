//! Data models
//!
//! Shared between piste-cloud and clients (via API).
//! Status enums carry `from_db`/`as_db` for their lowercase text columns.
//! Resource IDs are snowflake `i64`; user IDs are the auth provider's subject string.

pub mod class;
pub mod device;
pub mod notification;
pub mod payment_attempt;
pub mod push_log;
pub mod reservation;
pub mod settings;

// Re-exports
pub use class::*;
pub use device::*;
pub use notification::*;
pub use payment_attempt::*;
pub use push_log::*;
pub use reservation::*;
pub use settings::*;
