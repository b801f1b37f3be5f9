//! Booking Model

use serde::{Deserialize, Serialize};

use super::MemberRef;

/// Booking record (read-only for the console)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub date: String,
    #[serde(default)]
    pub member: Option<MemberRef>,
}
