//! Project namespace over a [`RemoteStore`](crate::store::RemoteStore).
//!
//! Multi-step operations are not atomic, and existence checks are not
//! compare-and-swap. Callers racing on one name must serialize themselves.

pub mod layout;
pub mod manager;
pub mod naming;
pub mod schema;

pub use layout::WorkspaceLayout;
pub use manager::{CreatedSearch, WorkspaceManager};
pub use schema::{ResourceKind, ResourceSchema};
