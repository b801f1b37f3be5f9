//! Shared types for the admin console
//!
//! Wire models for the four console collections and the login DTOs,
//! used by both the API server and the console client.

pub mod client;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use client::{LoginRequest, LoginResponse};
pub use models::{Amount, Booking, Member, MemberDraft, MemberRef, Payment, Sale};
