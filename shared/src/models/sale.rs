//! Sale Model

use serde::{Deserialize, Serialize};

use super::Amount;

/// Sale record (read-only for the console)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub date: String,
    #[serde(default)]
    pub amount: Option<Amount>,
}
