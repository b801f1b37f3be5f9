//! Display-only monetary amount

use serde::{Deserialize, Serialize};

/// Amount as sent by the server
///
/// The console only renders amounts, so both JSON numbers and decimal
/// strings are kept as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Number(value) => write!(f, "{value}"),
            Amount::Text(value) => f.write_str(value),
        }
    }
}
