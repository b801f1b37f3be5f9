//! Resource client
//!
//! One [`ResourceClient`] per entity collection, parameterized by its base
//! path. Failures are returned to the caller untouched; nothing is retried.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

use shared::{Booking, Member, Payment, Sale};

use crate::error::ClientResult;
use crate::transport::{ApiRequest, Transport, decode_json};

/// The four console collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Sales,
    Bookings,
    Members,
    Payments,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Sales,
        CollectionKind::Bookings,
        CollectionKind::Members,
        CollectionKind::Payments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Sales => "sales",
            CollectionKind::Bookings => "bookings",
            CollectionKind::Members => "members",
            CollectionKind::Payments => "payments",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server-held record type with a fixed collection endpoint
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection path, e.g. `/api/members`
    const PATH: &'static str;
    const KIND: CollectionKind;

    fn id(&self) -> i64;
}

impl Resource for Sale {
    const PATH: &'static str = "/api/sales";
    const KIND: CollectionKind = CollectionKind::Sales;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Resource for Booking {
    const PATH: &'static str = "/api/bookings";
    const KIND: CollectionKind = CollectionKind::Bookings;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Resource for Member {
    const PATH: &'static str = "/api/members";
    const KIND: CollectionKind = CollectionKind::Members;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Resource for Payment {
    const PATH: &'static str = "/api/payments";
    const KIND: CollectionKind = CollectionKind::Payments;

    fn id(&self) -> i64 {
        self.id
    }
}

/// Typed client for one collection endpoint
pub struct ResourceClient<T> {
    transport: Arc<dyn Transport>,
    base_path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceClient<T> {
    /// Client rooted at the record type's own collection path
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_base_path(transport, T::PATH)
    }

    pub fn with_base_path(transport: Arc<dyn Transport>, base_path: impl Into<String>) -> Self {
        Self {
            transport,
            base_path: base_path.into().trim_end_matches('/').to_string(),
            _marker: PhantomData,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    fn item_path(&self, id: i64) -> String {
        format!("{}/{}", self.base_path, id)
    }

    /// GET the whole collection, in server order
    pub async fn list(&self) -> ClientResult<Vec<T>> {
        let response = self.transport.send(ApiRequest::get(&self.base_path)).await?;
        decode_json(response)
    }

    /// PUT a partial record; the returned value is the server's truth
    pub async fn update<P>(&self, id: i64, patch: &P) -> ClientResult<T>
    where
        P: Serialize + Sync + ?Sized,
    {
        let body = serde_json::to_value(patch)?;
        let response = self
            .transport
            .send(ApiRequest::put(self.item_path(id), body))
            .await?;
        decode_json(response)
    }

    /// DELETE one record
    ///
    /// Any 2xx is success and the body is ignored. A 404 means the record is
    /// already gone and is treated as success.
    pub async fn remove(&self, id: i64) -> ClientResult<()> {
        let response = self
            .transport
            .send(ApiRequest::delete(self.item_path(id)))
            .await?;
        match response.error_for_status() {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %self.item_path(id), "Delete target already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_path: self.base_path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for ResourceClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("base_path", &self.base_path)
            .finish()
    }
}
