//! Console Client - data layer for the admin console
//!
//! Fetches the four console collections (sales, bookings, members,
//! payments), keeps one snapshot of each, and routes member edits through a
//! single draft. Access is gated by an opaque session token.

pub mod config;
pub mod console;
pub mod edit;
pub mod error;
pub mod gate;
pub mod resource;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use console::AdminConsole;
pub use edit::{EditDraft, EditError, EditSession, EditStateKind, MemberField};
pub use error::{ClientError, ClientResult};
pub use gate::{FileTokenStore, MemoryTokenStore, SessionGate, SessionToken, TokenStore};
pub use resource::{CollectionKind, Resource, ResourceClient};
pub use store::{CollectionStore, RefreshOutcome, RefreshReport, Snapshot, StoreEvent};
pub use transport::{ApiRequest, NetworkTransport, RawResponse, Transport};

// Re-export shared types for convenience
pub use shared::{Amount, Booking, LoginRequest, LoginResponse, Member, MemberDraft, MemberRef, Payment, Sale};
