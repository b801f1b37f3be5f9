//! Admin console facade
//!
//! Wires the session gate, the collection store and the edit session over a
//! single transport. Every successful mutation ends in a targeted refresh of
//! the owning collection; nothing is patched locally.

use std::sync::Arc;

use shared::{LoginRequest, LoginResponse, Member};

use crate::config::ClientConfig;
use crate::edit::{EditError, EditSession, MemberField};
use crate::error::ClientResult;
use crate::gate::{FileTokenStore, SessionGate};
use crate::resource::{CollectionKind, ResourceClient};
use crate::store::{CollectionStore, RefreshReport};
use crate::transport::{ApiRequest, NetworkTransport, Transport, decode_json};

const LOGIN_PATH: &str = "/api/login";

/// Data layer of the admin console
pub struct AdminConsole {
    gate: Arc<SessionGate>,
    transport: Arc<dyn Transport>,
    members: ResourceClient<Member>,
    store: CollectionStore,
    edit: EditSession,
}

impl AdminConsole {
    pub fn new(transport: Arc<dyn Transport>, gate: Arc<SessionGate>) -> Self {
        Self {
            members: ResourceClient::new(Arc::clone(&transport)),
            store: CollectionStore::new(Arc::clone(&transport), Arc::clone(&gate)),
            edit: EditSession::new(),
            gate,
            transport,
        }
    }

    /// Network-backed console
    ///
    /// With a `token_path` the gate is restored from (and persisted to) that
    /// file; otherwise the session lives in memory.
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let gate = match &config.token_path {
            Some(path) => SessionGate::restore(FileTokenStore::new(path)),
            None => SessionGate::in_memory(),
        };
        let gate = Arc::new(gate);
        let transport = NetworkTransport::new(config, Arc::clone(&gate))?;
        tracing::info!(base_url = %transport.base_url(), "Console client configured");
        Ok(Self::new(Arc::new(transport), gate))
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    pub fn is_authorized(&self) -> bool {
        self.gate.is_authorized()
    }

    // ========== Session ==========

    /// Exchange credentials for a token and admit it
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<()> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let body = serde_json::to_value(&request)?;
        let response = self.transport.send(ApiRequest::post(LOGIN_PATH, body)).await?;
        let login: LoginResponse = decode_json(response)?;
        self.gate.admit(login.token);
        Ok(())
    }

    /// Initial load of the protected view
    ///
    /// Fails with `NotAuthorized` when no token is present, which the caller
    /// treats as "go to login".
    pub async fn open(&self) -> ClientResult<RefreshReport> {
        self.store.refresh_all().await
    }

    /// End the session: token, snapshots and draft are all dropped
    pub fn logout(&self) {
        self.gate.revoke();
        self.store.clear();
        self.edit.reset();
    }

    // ========== Members ==========

    /// Start editing a member from the current snapshot
    pub fn begin_edit(&self, member_id: i64) -> Result<(), EditError> {
        let member = self
            .store
            .find_member(member_id)
            .ok_or(EditError::MemberNotFound(member_id))?;
        self.edit.begin(member)
    }

    pub fn set_field(&self, field: MemberField, value: impl Into<String>) -> Result<(), EditError> {
        self.edit.set_field(field, value)
    }

    pub async fn commit_edit(&self) -> Result<Member, EditError> {
        self.edit.commit(&self.members, &self.store).await
    }

    pub fn cancel_edit(&self) -> Result<(), EditError> {
        self.edit.cancel()
    }

    /// Delete a member and re-fetch the members collection
    ///
    /// An open draft for the deleted member is dropped. Bookings and payments
    /// keep their references; resolving them is the server's business.
    pub async fn delete_member(&self, member_id: i64) -> ClientResult<()> {
        self.members.remove(member_id).await?;
        tracing::info!(member_id, "Member deleted");

        self.edit.reset_if_target(member_id);
        if let Err(e) = self.store.refresh_one(CollectionKind::Members).await {
            tracing::warn!(member_id, "Member refresh after delete failed: {e}");
        }
        Ok(())
    }
}

impl std::fmt::Debug for AdminConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole")
            .field("gate", &self.gate)
            .field("store", &self.store)
            .field("edit", &self.edit.state())
            .finish()
    }
}
