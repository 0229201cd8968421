//! Hierarchical document paths.
//!
//! Paths alternate collection and document segments:
//!
//! ```text
//! users/{userId}/vehicles/{vehicleId}
//! └─┬─┘ └──┬───┘ └──┬───┘ └───┬────┘
//!  coll    doc     coll       doc
//! ```
//!
//! Segments are validated on construction so that a caller-supplied id can
//! never escape its collection.

use std::fmt;

use crate::error::StoreError;

// =============================================================================
// Collection Names
// =============================================================================

pub const USERS: &str = "users";
pub const USER_VEHICLES: &str = "vehicles";
pub const USER_PERSONAL_DATA: &str = "personalData";
pub const USER_HEALTH_DATA: &str = "healthData";
pub const USER_EMERGENCY_CONTACTS: &str = "emergencyContacts";
pub const USER_MEMBERSHIP: &str = "membership";

pub const EVENTS: &str = "events";
pub const EVENT_CHECKPOINTS: &str = "checkpoints";
pub const DAY_OF_RACES: &str = "day_of_races";
pub const EVENT_CATEGORIES: &str = "event_categories";
pub const EVENT_PARTICIPANTS: &str = "participants";
pub const EVENT_ROUTES: &str = "routes";
pub const EVENT_CONTENT: &str = "event_content";

pub const EVENTS_TRACKING: &str = "events_tracking";
pub const COMPETITOR_TRACKING: &str = "competitor_tracking";
pub const TRACKING_COMPETITORS: &str = "competitors";
pub const TRACKING_CHECKPOINTS: &str = "checkpoints";
pub const TRACKING_ROUTES: &str = "routes";

pub const CATALOGS: &str = "catalogs";
pub const CATALOGS_DEFAULT_DOC: &str = "default";

fn check_segment(segment: &str) -> Result<(), StoreError> {
    if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
        return Err(StoreError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

// =============================================================================
// Paths
// =============================================================================

/// Path of a collection (odd number of segments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

/// Path of a document (even number of segments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: &str) -> Result<Self, StoreError> {
        check_segment(name)?;
        Ok(Self(name.to_string()))
    }

    /// Document `id` inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocPath, StoreError> {
        check_segment(id)?;
        Ok(DocPath(format!("{}/{}", self.0, id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment (the collection id).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Parent document, `None` for a top-level collection.
    pub fn parent(&self) -> Option<DocPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| DocPath(parent.to_string()))
    }
}

impl DocPath {
    /// Subcollection `name` under this document.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, StoreError> {
        check_segment(name)?;
        Ok(CollectionPath(format!("{}/{}", self.0, name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Document id (last segment).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(self.0.clone()),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Path Builders
// =============================================================================

pub fn user(user_id: &str) -> Result<DocPath, StoreError> {
    CollectionPath::root(USERS)?.doc(user_id)
}

pub fn users() -> Result<CollectionPath, StoreError> {
    CollectionPath::root(USERS)
}

pub fn user_vehicles(user_id: &str) -> Result<CollectionPath, StoreError> {
    user(user_id)?.collection(USER_VEHICLES)
}

/// Subcollection of a user (`personalData`, `membership`, ...).
pub fn user_collection(user_id: &str, name: &str) -> Result<CollectionPath, StoreError> {
    user(user_id)?.collection(name)
}

pub fn events() -> Result<CollectionPath, StoreError> {
    CollectionPath::root(EVENTS)
}

pub fn event(event_id: &str) -> Result<DocPath, StoreError> {
    CollectionPath::root(EVENTS)?.doc(event_id)
}

/// Subcollection of an event (`participants`, `routes`, ...).
pub fn event_collection(event_id: &str, name: &str) -> Result<CollectionPath, StoreError> {
    event(event_id)?.collection(name)
}

/// `events_tracking/{eventId}/competitor_tracking/{eventId}_{dayOfRaceId}`
pub fn tracking(event_id: &str, day_of_race_id: &str) -> Result<DocPath, StoreError> {
    CollectionPath::root(EVENTS_TRACKING)?
        .doc(event_id)?
        .collection(COMPETITOR_TRACKING)?
        .doc(&format!("{}_{}", event_id, day_of_race_id))
}

pub fn tracking_competitors(
    event_id: &str,
    day_of_race_id: &str,
) -> Result<CollectionPath, StoreError> {
    tracking(event_id, day_of_race_id)?.collection(TRACKING_COMPETITORS)
}

pub fn tracking_checkpoints(
    event_id: &str,
    day_of_race_id: &str,
    competitor_id: &str,
) -> Result<CollectionPath, StoreError> {
    tracking_competitors(event_id, day_of_race_id)?
        .doc(competitor_id)?
        .collection(TRACKING_CHECKPOINTS)
}

pub fn tracking_routes(event_id: &str, day_of_race_id: &str) -> Result<CollectionPath, StoreError> {
    tracking(event_id, day_of_race_id)?.collection(TRACKING_ROUTES)
}

/// `catalogs/default/{name}`
pub fn catalog(name: &str) -> Result<CollectionPath, StoreError> {
    CollectionPath::root(CATALOGS)?
        .doc(CATALOGS_DEFAULT_DOC)?
        .collection(name)
}
