//! Data models
//!
//! Shared between the admin API and the console client.
//! All IDs are `i64`.

pub mod amount;
pub mod booking;
pub mod member;
pub mod payment;
pub mod sale;

// Re-exports
pub use amount::*;
pub use booking::*;
pub use member::*;
pub use payment::*;
pub use sale::*;
