//! Member Model

use serde::{Deserialize, Serialize};

/// Member entity (会员)
///
/// The only collection the console mutates: `name` and `email` are editable,
/// and the whole record can be deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Update member payload (`PUT /api/members/{id}`)
///
/// Always carries both editable fields; the server answers with the stored
/// record, which may differ from what was sent (normalization).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDraft {
    pub name: String,
    pub email: String,
}

impl From<&Member> for MemberDraft {
    fn from(member: &Member) -> Self {
        Self {
            name: member.name.clone(),
            email: member.email.clone(),
        }
    }
}

/// Reference from a booking or payment to a member.
///
/// Servers send either the numeric member id or a display name. The client
/// keeps whatever it receives and never re-resolves it, so a deleted member
/// can still be referenced until the server says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberRef {
    Id(i64),
    Name(String),
}

impl std::fmt::Display for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberRef::Id(id) => write!(f, "{id}"),
            MemberRef::Name(name) => f.write_str(name),
        }
    }
}
