//! Entity resolution for every endpoint.
//!
//! [`RaceService`] wraps a [`DocumentStore`] and implements each endpoint's
//! lookup chain as one async method. Lookups run strictly in sequence and
//! the first missing entity (or false business flag) ends the chain with
//! [`ServiceError::NotFound`]. The methods are split by domain:
//!
//! - `vehicles` - a user's garage and vehicle search
//! - `competitors` - participants, competitor registration and route resolution
//! - `race_days` - days of race and event checkpoints
//! - `tracking` - tracking views and status mutations
//! - `users` - profiles and user creation
//! - `events` - the paginated events listing and event detail
//! - `catalogs` - shared catalogs

mod catalogs;
mod competitors;
mod events;
mod race_days;
mod tracking;
mod users;
mod vehicles;

pub use events::{EventsPage, DEFAULT_EVENTS_PAGE_SIZE, MAX_EVENTS_PAGE_SIZE};

use tracing::debug;

use crate::error::ServiceError;
use crate::store::{DocPath, Document, DocumentStore};

/// Service resolving API requests against a document store.
pub struct RaceService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> RaceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch a document or fail with `NotFound` naming `what`.
    async fn require(&self, path: &DocPath, what: &str) -> Result<Document, ServiceError> {
        match self.store.get(path).await? {
            Some(doc) => Ok(doc),
            None => {
                debug!(path = %path, "{} not found", what);
                Err(ServiceError::not_found(format!("{} {}", what, path.id())))
            }
        }
    }
}
