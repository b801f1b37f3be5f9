//! Edit session
//!
//! At most one member draft exists at a time:
//!
//! ```text
//! Idle --begin--> Editing --commit--> Committing --ok--> Idle
//!                  ^   |                  |
//!                  |   +--cancel--> Idle  +--err--> Editing (draft kept)
//!                  +--begin (discards the previous draft)
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use shared::{Member, MemberDraft};

use crate::error::ClientError;
use crate::resource::{CollectionKind, ResourceClient};
use crate::store::CollectionStore;

/// Editable member fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberField {
    Name,
    Email,
}

impl std::str::FromStr for MemberField {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(MemberField::Name),
            "email" => Ok(MemberField::Email),
            other => Err(EditError::UnknownField(other.to_string())),
        }
    }
}

/// The record under edit and its working copy
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    pub original: Member,
    pub working: MemberDraft,
}

impl EditDraft {
    fn new(member: Member) -> Self {
        let working = MemberDraft::from(&member);
        Self {
            original: member,
            working,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
enum EditState {
    #[default]
    Idle,
    Editing(EditDraft),
    Committing(EditDraft),
}

impl EditState {
    fn kind(&self) -> EditStateKind {
        match self {
            EditState::Idle => EditStateKind::Idle,
            EditState::Editing(_) => EditStateKind::Editing,
            EditState::Committing(_) => EditStateKind::Committing,
        }
    }

    fn draft(&self) -> Option<&EditDraft> {
        match self {
            EditState::Idle => None,
            EditState::Editing(draft) | EditState::Committing(draft) => Some(draft),
        }
    }
}

/// Observable edit state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStateKind {
    Idle,
    Editing,
    Committing,
}

impl std::fmt::Display for EditStateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditStateKind::Idle => f.write_str("idle"),
            EditStateKind::Editing => f.write_str("editing"),
            EditStateKind::Committing => f.write_str("committing"),
        }
    }
}

/// Edit session error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("cannot {op} while {state}")]
    InvalidState {
        op: &'static str,
        state: EditStateKind,
    },

    #[error("unknown member field: {0}")]
    UnknownField(String),

    #[error("member {0} not found")]
    MemberNotFound(i64),

    /// Update rejected; the draft is back in `Editing` for retry or cancel
    #[error("commit failed: {0}")]
    Commit(#[source] ClientError),
}

/// Single-draft member editor
#[derive(Debug, Default)]
pub struct EditSession {
    state: Mutex<EditState>,
    /// Bumped under the state lock by `begin` and every reset; a commit only
    /// settles the state if no newer session was opened meanwhile.
    generation: AtomicU64,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditStateKind {
        self.state.lock().kind()
    }

    pub fn draft(&self) -> Option<EditDraft> {
        self.state.lock().draft().cloned()
    }

    /// Open a draft for `member`, replacing any unsaved draft
    pub fn begin(&self, member: Member) -> Result<(), EditError> {
        let mut state = self.state.lock();
        if let EditState::Committing(_) = &*state {
            return Err(EditError::InvalidState {
                op: "begin",
                state: EditStateKind::Committing,
            });
        }
        if let EditState::Editing(previous) = &*state {
            tracing::debug!(
                member_id = previous.original.id,
                "Discarding unsaved draft"
            );
        }
        tracing::debug!(member_id = member.id, "Edit started");
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = EditState::Editing(EditDraft::new(member));
        Ok(())
    }

    /// Local change to the working copy; no network effect
    pub fn set_field(&self, field: MemberField, value: impl Into<String>) -> Result<(), EditError> {
        let mut state = self.state.lock();
        match &mut *state {
            EditState::Editing(draft) => {
                match field {
                    MemberField::Name => draft.working.name = value.into(),
                    MemberField::Email => draft.working.email = value.into(),
                }
                Ok(())
            }
            other => Err(EditError::InvalidState {
                op: "set field",
                state: other.kind(),
            }),
        }
    }

    /// Discard the draft without any network call
    pub fn cancel(&self) -> Result<(), EditError> {
        let mut state = self.state.lock();
        match &*state {
            EditState::Editing(_) => {
                *state = EditState::Idle;
                Ok(())
            }
            other => Err(EditError::InvalidState {
                op: "cancel",
                state: other.kind(),
            }),
        }
    }

    /// Force `Idle` from any state
    pub fn reset(&self) {
        let mut state = self.state.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = EditState::Idle;
    }

    /// Force `Idle` if the open draft targets `member_id`
    pub fn reset_if_target(&self, member_id: i64) -> bool {
        let mut state = self.state.lock();
        let targeted = state
            .draft()
            .is_some_and(|draft| draft.original.id == member_id);
        if targeted {
            tracing::info!(member_id, "Edit session reset, target removed");
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = EditState::Idle;
        }
        targeted
    }

    /// Send the working copy and re-fetch members on success
    ///
    /// Returns the server's version of the member. If the session was reset
    /// while the update was in flight, the late result leaves it alone.
    pub async fn commit(
        &self,
        members: &ResourceClient<Member>,
        store: &CollectionStore,
    ) -> Result<Member, EditError> {
        let (draft, generation) = {
            let mut state = self.state.lock();
            match std::mem::take(&mut *state) {
                EditState::Editing(draft) => {
                    *state = EditState::Committing(draft.clone());
                    (draft, self.generation.load(Ordering::SeqCst))
                }
                other => {
                    let kind = other.kind();
                    *state = other;
                    return Err(EditError::InvalidState {
                        op: "commit",
                        state: kind,
                    });
                }
            }
        };

        let member_id = draft.original.id;
        tracing::info!(member_id, "Committing member edit");

        let result = members.update(member_id, &draft.working).await;
        match result {
            Ok(updated) => {
                self.settle(generation, EditState::Idle);
                if let Err(e) = store.refresh_one(CollectionKind::Members).await {
                    tracing::warn!(member_id, "Member refresh after commit failed: {e}");
                }
                Ok(updated)
            }
            Err(e) => {
                tracing::warn!(member_id, "Member commit failed: {e}");
                self.settle(generation, EditState::Editing(draft));
                Err(EditError::Commit(e))
            }
        }
    }

    fn settle(&self, generation: u64, next: EditState) {
        let mut state = self.state.lock();
        if matches!(&*state, EditState::Committing(_))
            && self.generation.load(Ordering::SeqCst) == generation
        {
            *state = next;
        }
    }
}
