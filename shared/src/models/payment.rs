//! Payment Model

use serde::{Deserialize, Serialize};

use super::{Amount, MemberRef};

/// Payment record (read-only for the console)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub date: String,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub member: Option<MemberRef>,
}
