//! Authentication middleware for user sessions

pub mod user_auth;

pub use user_auth::UserIdentity;
