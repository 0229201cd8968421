//! Request bodies and response shapes.
//!
//! Request bodies are validated here into typed inputs; responses are
//! flat serde structs (never wrapped in an envelope).

pub mod catalog;
pub mod competitor;
pub mod registration;
pub mod tracking;
pub mod vehicle;

use serde_json::{Map, Value as Json};

use crate::error::ServiceError;

pub use catalog::CatalogKind;
pub use competitor::{Competitor, CompetitorRoute, RouteCompetitor, RouteSummary};
pub use registration::{
    CompetitionEntry, CompetitorUserCreated, CompetitorUserInput, CompetitorUserTarget,
    ParticipantInput,
};
pub use tracking::{
    is_competitor_visible, CheckpointType, CompetitorStatus, CompetitorTrackingView,
    StatusChange, StatusUpdate, TrackedCompetitor, TrackingCheckpointView,
};
pub use vehicle::{Vehicle, VehicleInput};

/// Require a JSON object body.
pub(crate) fn body_object(body: &Json) -> Result<&Map<String, Json>, ServiceError> {
    body.as_object()
        .ok_or_else(|| ServiceError::bad_request("body must be a JSON object"))
}

/// Require a string field that is non-empty after trimming; returns it trimmed.
pub(crate) fn trimmed_string(object: &Map<String, Json>, key: &str) -> Result<String, ServiceError> {
    object
        .get(key)
        .and_then(Json::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::bad_request(format!("{} is required", key)))
}

/// Optional string field; non-strings are rejected.
pub(crate) fn optional_string(
    object: &Map<String, Json>,
    key: &str,
) -> Result<Option<String>, ServiceError> {
    match object.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ServiceError::bad_request(format!("{} must be a string", key))),
    }
}
