//! Collection store
//!
//! Owns one snapshot per collection kind. A snapshot is only ever replaced
//! wholesale by a successful refresh; readers get an `Arc<[T]>` and never see
//! a partially updated sequence.
//!
//! Every refresh is stamped when issued. A completion is applied only if its
//! stamp is newer than the last applied one, so a slow, earlier refresh can
//! never overwrite the result of a later one.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use shared::{Booking, Member, Payment, Sale};

use crate::error::{ClientError, ClientResult};
use crate::gate::SessionGate;
use crate::resource::{CollectionKind, Resource, ResourceClient};
use crate::transport::Transport;

/// Immutable view of a collection
pub type Snapshot<T> = Arc<[T]>;

const EVENT_CAPACITY: usize = 64;

/// Result of a single refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot replaced with `len` records
    Applied { len: usize },
    /// A newer refresh of the same kind already landed; this one was dropped
    Superseded,
}

/// Store notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Refreshed { kind: CollectionKind, len: usize },
    RefreshFailed { kind: CollectionKind, error: ClientError },
    Cleared,
}

/// Per-kind outcomes of [`CollectionStore::refresh_all`]
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    outcomes: BTreeMap<CollectionKind, ClientResult<RefreshOutcome>>,
}

impl RefreshReport {
    pub fn get(&self, kind: CollectionKind) -> Option<&ClientResult<RefreshOutcome>> {
        self.outcomes.get(&kind)
    }

    /// Kinds whose refresh failed, with the error
    pub fn failures(&self) -> impl Iterator<Item = (CollectionKind, &ClientError)> {
        self.outcomes
            .iter()
            .filter_map(|(kind, outcome)| outcome.as_ref().err().map(|e| (*kind, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

// ============================================================================
// Collection
// ============================================================================

struct SlotState<T> {
    snapshot: Snapshot<T>,
    /// Stamp of the refresh that produced `snapshot`
    applied: u64,
    /// Stamp of the refresh that produced `last_error`
    failed: u64,
    last_error: Option<ClientError>,
}

/// One collection's snapshot plus its refresh bookkeeping
pub struct Collection<T> {
    state: RwLock<SlotState<T>>,
    issued: AtomicU64,
    fetches: AtomicU64,
}

impl<T: Resource> Collection<T> {
    fn new() -> Self {
        Self {
            state: RwLock::new(SlotState {
                snapshot: Arc::from(Vec::new()),
                applied: 0,
                failed: 0,
                last_error: None,
            }),
            issued: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        Arc::clone(&self.state.read().snapshot)
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.state.read().last_error.clone()
    }

    /// Record with `id` in the current snapshot
    pub fn find(&self, id: i64) -> Option<T> {
        self.snapshot().iter().find(|record| record.id() == id).cloned()
    }

    /// Number of list requests issued for this collection
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn issue(&self) -> u64 {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply(&self, stamp: u64, result: ClientResult<Vec<T>>) -> ClientResult<RefreshOutcome> {
        let mut state = self.state.write();
        if stamp <= state.applied {
            return Ok(RefreshOutcome::Superseded);
        }
        match result {
            Ok(items) => {
                let len = items.len();
                state.snapshot = Arc::from(items);
                state.applied = stamp;
                if stamp > state.failed {
                    state.last_error = None;
                }
                Ok(RefreshOutcome::Applied { len })
            }
            Err(e) if stamp > state.failed => {
                state.failed = stamp;
                state.last_error = Some(e.clone());
                Err(e)
            }
            // a newer attempt already reported its own failure
            Err(_) => Ok(RefreshOutcome::Superseded),
        }
    }

    fn clear(&self) {
        let mut state = self.state.write();
        let horizon = self.issued.load(Ordering::SeqCst);
        state.snapshot = Arc::from(Vec::new());
        state.applied = horizon;
        state.failed = horizon;
        state.last_error = None;
    }
}

// ============================================================================
// CollectionStore
// ============================================================================

/// In-memory snapshots of the four console collections
pub struct CollectionStore {
    gate: Arc<SessionGate>,
    sales: Collection<Sale>,
    bookings: Collection<Booking>,
    members: Collection<Member>,
    payments: Collection<Payment>,
    sales_client: ResourceClient<Sale>,
    bookings_client: ResourceClient<Booking>,
    members_client: ResourceClient<Member>,
    payments_client: ResourceClient<Payment>,
    events: broadcast::Sender<StoreEvent>,
}

impl CollectionStore {
    /// Empty store; nothing is fetched until the first refresh
    pub fn new(transport: Arc<dyn Transport>, gate: Arc<SessionGate>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gate,
            sales: Collection::new(),
            bookings: Collection::new(),
            members: Collection::new(),
            payments: Collection::new(),
            sales_client: ResourceClient::new(Arc::clone(&transport)),
            bookings_client: ResourceClient::new(Arc::clone(&transport)),
            members_client: ResourceClient::new(Arc::clone(&transport)),
            payments_client: ResourceClient::new(transport),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn ensure_authorized(&self) -> ClientResult<()> {
        if self.gate.is_authorized() {
            Ok(())
        } else {
            Err(ClientError::NotAuthorized)
        }
    }

    /// Refresh all four collections concurrently
    ///
    /// Each collection applies its own result as soon as its fetch completes.
    /// Only a closed gate fails the call as a whole; per-kind failures are in
    /// the report and in [`CollectionStore::last_error`].
    pub async fn refresh_all(&self) -> ClientResult<RefreshReport> {
        self.ensure_authorized()?;

        let (sales, bookings, members, payments) = tokio::join!(
            self.refresh_collection(&self.sales, &self.sales_client),
            self.refresh_collection(&self.bookings, &self.bookings_client),
            self.refresh_collection(&self.members, &self.members_client),
            self.refresh_collection(&self.payments, &self.payments_client),
        );

        let report = RefreshReport {
            outcomes: BTreeMap::from([
                (CollectionKind::Sales, sales),
                (CollectionKind::Bookings, bookings),
                (CollectionKind::Members, members),
                (CollectionKind::Payments, payments),
            ]),
        };
        let failed = report.failures().count();
        if failed > 0 {
            tracing::warn!(failed, "Refresh completed with failures");
        }
        Ok(report)
    }

    /// Refresh a single collection
    pub async fn refresh_one(&self, kind: CollectionKind) -> ClientResult<RefreshOutcome> {
        self.ensure_authorized()?;

        match kind {
            CollectionKind::Sales => {
                self.refresh_collection(&self.sales, &self.sales_client).await
            }
            CollectionKind::Bookings => {
                self.refresh_collection(&self.bookings, &self.bookings_client)
                    .await
            }
            CollectionKind::Members => {
                self.refresh_collection(&self.members, &self.members_client)
                    .await
            }
            CollectionKind::Payments => {
                self.refresh_collection(&self.payments, &self.payments_client)
                    .await
            }
        }
    }

    async fn refresh_collection<T: Resource>(
        &self,
        slot: &Collection<T>,
        client: &ResourceClient<T>,
    ) -> ClientResult<RefreshOutcome> {
        let kind = T::KIND;
        let stamp = slot.issue();
        tracing::debug!(%kind, stamp, "Refreshing collection");

        let result = client.list().await;
        let outcome = slot.apply(stamp, result);

        match &outcome {
            Ok(RefreshOutcome::Applied { len }) => {
                tracing::info!(%kind, stamp, len, "Collection refreshed");
                let _ = self.events.send(StoreEvent::Refreshed { kind, len: *len });
            }
            Ok(RefreshOutcome::Superseded) => {
                tracing::debug!(%kind, stamp, "Discarded stale refresh");
            }
            Err(error) => {
                tracing::warn!(%kind, stamp, "Collection refresh failed: {error}");
                let _ = self.events.send(StoreEvent::RefreshFailed {
                    kind,
                    error: error.clone(),
                });
            }
        }
        outcome
    }

    /// Drop every snapshot (session end)
    ///
    /// Refreshes still in flight are discarded when they complete.
    pub fn clear(&self) {
        self.sales.clear();
        self.bookings.clear();
        self.members.clear();
        self.payments.clear();
        let _ = self.events.send(StoreEvent::Cleared);
        tracing::debug!("Collection store cleared");
    }

    // ========== Readers ==========

    pub fn sales(&self) -> Snapshot<Sale> {
        self.sales.snapshot()
    }

    pub fn bookings(&self) -> Snapshot<Booking> {
        self.bookings.snapshot()
    }

    pub fn members(&self) -> Snapshot<Member> {
        self.members.snapshot()
    }

    pub fn payments(&self) -> Snapshot<Payment> {
        self.payments.snapshot()
    }

    /// Member with `id` in the current snapshot
    pub fn find_member(&self, id: i64) -> Option<Member> {
        self.members.find(id)
    }

    /// Last refresh failure of `kind`, cleared by the next successful refresh
    pub fn last_error(&self, kind: CollectionKind) -> Option<ClientError> {
        match kind {
            CollectionKind::Sales => self.sales.last_error(),
            CollectionKind::Bookings => self.bookings.last_error(),
            CollectionKind::Members => self.members.last_error(),
            CollectionKind::Payments => self.payments.last_error(),
        }
    }

    pub fn fetch_count(&self, kind: CollectionKind) -> u64 {
        match kind {
            CollectionKind::Sales => self.sales.fetch_count(),
            CollectionKind::Bookings => self.bookings.fetch_count(),
            CollectionKind::Members => self.members.fetch_count(),
            CollectionKind::Payments => self.payments.fetch_count(),
        }
    }
}

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore")
            .field("sales", &self.sales.snapshot().len())
            .field("bookings", &self.bookings.snapshot().len())
            .field("members", &self.members.snapshot().len())
            .field("payments", &self.payments.snapshot().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, json_response};
    use futures::poll;
    use http::Method;
    use serde_json::json;
    use shared::{Amount, MemberRef};

    fn authorized_store() -> (Arc<ScriptedTransport>, CollectionStore) {
        let transport = Arc::new(ScriptedTransport::new());
        let gate = Arc::new(SessionGate::in_memory());
        gate.admit("dummy-token");
        let store = CollectionStore::new(transport.clone(), gate);
        (transport, store)
    }

    fn script_all(transport: &ScriptedTransport) {
        transport.respond(
            Method::GET,
            "/api/sales",
            200,
            json!([{"id": 1, "date": "2024-01-01", "amount": 10.0}]),
        );
        transport.respond(
            Method::GET,
            "/api/bookings",
            200,
            json!([{"id": 1, "date": "2024-01-01", "member": 1}]),
        );
        transport.respond(
            Method::GET,
            "/api/members",
            200,
            json!([
                {"id": 2, "name": "B", "email": "b@x.com"},
                {"id": 1, "name": "A", "email": "a@x.com"}
            ]),
        );
        transport.respond(
            Method::GET,
            "/api/payments",
            200,
            json!([{"id": 1, "date": "2024-01-01", "amount": 5.5, "member": "A"}]),
        );
    }

    #[tokio::test]
    async fn test_refresh_all_replaces_every_snapshot() {
        let (transport, store) = authorized_store();
        script_all(&transport);

        let report = store.refresh_all().await.unwrap();
        assert!(report.is_success());

        assert_eq!(
            store.sales().to_vec(),
            vec![Sale {
                id: 1,
                date: "2024-01-01".into(),
                amount: Some(Amount::Number(10.0)),
            }]
        );
        assert_eq!(
            store.bookings().to_vec(),
            vec![Booking {
                id: 1,
                date: "2024-01-01".into(),
                member: Some(MemberRef::Id(1)),
            }]
        );
        assert_eq!(
            store.members().to_vec(),
            vec![
                Member {
                    id: 2,
                    name: "B".into(),
                    email: "b@x.com".into(),
                },
                Member {
                    id: 1,
                    name: "A".into(),
                    email: "a@x.com".into(),
                },
            ]
        );
        assert_eq!(
            store.payments().to_vec(),
            vec![Payment {
                id: 1,
                date: "2024-01-01".into(),
                amount: Some(Amount::Number(5.5)),
                member: Some(MemberRef::Name("A".into())),
            }]
        );
        assert_eq!(store.find_member(1).map(|m| m.name), Some("A".to_string()));
        assert!(store.find_member(3).is_none());
        for kind in CollectionKind::ALL {
            assert_eq!(
                report.get(kind),
                Some(&Ok(RefreshOutcome::Applied {
                    len: if kind == CollectionKind::Members { 2 } else { 1 }
                }))
            );
            assert_eq!(store.fetch_count(kind), 1);
            assert!(store.last_error(kind).is_none());
        }
    }

    #[tokio::test]
    async fn test_refresh_all_partial_failure_keeps_failed_snapshot() {
        let (transport, store) = authorized_store();
        script_all(&transport);
        store.refresh_all().await.unwrap();

        transport.respond(Method::GET, "/api/sales", 200, json!([]));
        transport.respond(Method::GET, "/api/bookings", 200, json!([]));
        transport.respond(Method::GET, "/api/members", 500, json!({"error": "db"}));
        transport.respond(Method::GET, "/api/payments", 200, json!([]));

        let report = store.refresh_all().await.unwrap();
        let failures: Vec<CollectionKind> = report.failures().map(|(k, _)| k).collect();
        assert_eq!(failures, vec![CollectionKind::Members]);

        assert!(store.sales().is_empty());
        assert!(store.bookings().is_empty());
        assert!(store.payments().is_empty());
        assert_eq!(store.members().len(), 2);
        assert_eq!(
            store.last_error(CollectionKind::Members).and_then(|e| e.status()),
            Some(500)
        );
    }

    #[tokio::test]
    async fn test_slow_collection_does_not_block_others() {
        let (transport, store) = authorized_store();
        transport.respond(Method::GET, "/api/sales", 200, json!([]));
        transport.respond(Method::GET, "/api/bookings", 200, json!([]));
        let slow = transport.gate(Method::GET, "/api/members");
        transport.respond(Method::GET, "/api/payments", 200, json!([
            {"id": 7, "date": "2024-02-01", "amount": 1.0, "member": 1}
        ]));

        let mut refresh = Box::pin(store.refresh_all());
        assert!(poll!(refresh.as_mut()).is_pending());

        // members still in flight, payments already visible
        assert_eq!(store.payments().len(), 1);
        assert!(store.members().is_empty());

        slow.send(json_response(200, json!([{"id": 1, "name": "A", "email": "a@x.com"}])))
            .unwrap();
        let report = refresh.await.unwrap();
        assert!(report.is_success());
        assert_eq!(store.members().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_one_touches_only_its_kind() {
        let (transport, store) = authorized_store();
        transport.respond(Method::GET, "/api/members", 200, json!([]));

        let outcome = store.refresh_one(CollectionKind::Members).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Applied { len: 0 });
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(store.fetch_count(CollectionKind::Sales), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_completion_keeps_newest() {
        let (transport, store) = authorized_store();
        let first = transport.gate(Method::GET, "/api/members");
        let second = transport.gate(Method::GET, "/api/members");

        let mut refresh_a = Box::pin(store.refresh_one(CollectionKind::Members));
        let mut refresh_b = Box::pin(store.refresh_one(CollectionKind::Members));
        assert!(poll!(refresh_a.as_mut()).is_pending());
        assert!(poll!(refresh_b.as_mut()).is_pending());

        second
            .send(json_response(200, json!([{"id": 2, "name": "B", "email": "b@x.com"}])))
            .unwrap();
        assert_eq!(
            refresh_b.await.unwrap(),
            RefreshOutcome::Applied { len: 1 }
        );

        first
            .send(json_response(200, json!([{"id": 1, "name": "A", "email": "a@x.com"}])))
            .unwrap();
        assert_eq!(refresh_a.await.unwrap(), RefreshOutcome::Superseded);

        let members = store.members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "B");
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_report() {
        let (transport, store) = authorized_store();
        let first = transport.gate(Method::GET, "/api/members");
        let second = transport.gate(Method::GET, "/api/members");

        let mut refresh_a = Box::pin(store.refresh_one(CollectionKind::Members));
        let mut refresh_b = Box::pin(store.refresh_one(CollectionKind::Members));
        assert!(poll!(refresh_a.as_mut()).is_pending());
        assert!(poll!(refresh_b.as_mut()).is_pending());

        second.send(json_response(200, json!([]))).unwrap();
        refresh_b.await.unwrap();

        first
            .send(Err(ClientError::Network("reset".into())))
            .unwrap();
        assert_eq!(refresh_a.await.unwrap(), RefreshOutcome::Superseded);
        assert!(store.last_error(CollectionKind::Members).is_none());
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let (transport, store) = authorized_store();
        transport.fail(
            Method::GET,
            "/api/sales",
            ClientError::Network("refused".into()),
        );
        transport.respond(Method::GET, "/api/sales", 200, json!([]));

        assert!(store.refresh_one(CollectionKind::Sales).await.is_err());
        assert!(store.last_error(CollectionKind::Sales).is_some());

        store.refresh_one(CollectionKind::Sales).await.unwrap();
        assert!(store.last_error(CollectionKind::Sales).is_none());
    }

    #[tokio::test]
    async fn test_closed_gate_blocks_refresh() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = CollectionStore::new(transport.clone(), Arc::new(SessionGate::in_memory()));

        assert_eq!(
            store.refresh_all().await.unwrap_err(),
            ClientError::NotAuthorized
        );
        assert_eq!(
            store.refresh_one(CollectionKind::Members).await.unwrap_err(),
            ClientError::NotAuthorized
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_refresh() {
        let (transport, store) = authorized_store();
        let pending = transport.gate(Method::GET, "/api/members");

        let mut refresh = Box::pin(store.refresh_one(CollectionKind::Members));
        assert!(poll!(refresh.as_mut()).is_pending());

        store.clear();
        pending
            .send(json_response(200, json!([{"id": 1, "name": "A", "email": "a@x.com"}])))
            .unwrap();
        assert_eq!(refresh.await.unwrap(), RefreshOutcome::Superseded);
        assert!(store.members().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (transport, store) = authorized_store();
        let mut events = store.subscribe();
        transport.respond(Method::GET, "/api/sales", 200, json!([]));
        transport.respond(Method::GET, "/api/payments", 502, json!({}));

        store.refresh_one(CollectionKind::Sales).await.unwrap();
        let _ = store.refresh_one(CollectionKind::Payments).await;

        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::Refreshed {
                kind: CollectionKind::Sales,
                len: 0
            }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::RefreshFailed {
                kind: CollectionKind::Payments,
                ..
            }
        ));
    }
}
