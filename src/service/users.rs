use serde_json::{json, Map, Value as Json};
use tracing::{info, warn};

use super::RaceService;
use crate::error::ServiceError;
use crate::model::body_object;
use crate::store::path::{self, EVENT_CHECKPOINTS};
use crate::store::value::now;
use crate::store::{Document, DocumentStore, Fields, Filter, Query, Value};

/// App version reported when a profile carries none.
pub const DEFAULT_APP_VERSION: &str = "2.0.0";

/// Top-level keys accepted when creating a user.
const USER_KEYS: [&str; 7] = [
    "authUserId",
    "avatarUrl",
    "emergencyContact",
    "eventStaffRelations",
    "isActive",
    "personalData",
    "userData",
];

impl<S: DocumentStore> RaceService<S> {
    /// Profile of the user whose `authUserId` is `auth_user_id`, with the
    /// events the user is assigned to as staff.
    pub async fn user_profile(&self, auth_user_id: &str) -> Result<Json, ServiceError> {
        let users = self
            .store
            .query(
                &path::users()?,
                &Query::new().filter(Filter::eq("authUserId", auth_user_id)).limit(1),
            )
            .await?;
        let user = users
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(format!("user with auth id {}", auth_user_id)))?;

        let mut profile = match user.to_json() {
            Json::Object(object) => object,
            _ => Map::new(),
        };
        for key in ["personalData", "emergencyContact", "userData"] {
            let entry = profile.entry(key).or_insert(Json::Null);
            if entry.is_null() {
                *entry = json!({});
            }
        }
        if profile.get("appVersion").map_or(true, Json::is_null) {
            let version = profile["userData"]
                .get("appVersion")
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Json::from(DEFAULT_APP_VERSION));
            profile.insert("appVersion".into(), version);
        }

        let assigned = self.assigned_events(&user).await?;
        profile.insert("assignedEvents".into(), Json::Array(assigned));
        Ok(Json::Object(profile))
    }

    async fn assigned_events(&self, user: &Document) -> Result<Vec<Json>, ServiceError> {
        let relations = user
            .get("eventStaffRelations")
            .and_then(Value::as_array)
            .unwrap_or_default();

        let mut events = Vec::new();
        for relation in relations {
            let Some(relation) = relation.as_map() else {
                continue;
            };
            let Some(event_id) = relation.get("eventId").and_then(Value::as_str) else {
                continue;
            };
            if event_id.is_empty() {
                continue;
            }

            let Some(event) = self.store.get(&path::event(event_id)?).await? else {
                warn!(event_id = event_id, "Assigned event not found");
                continue;
            };

            let mut object = Map::new();
            object.insert("id".into(), Json::from(event.id.as_str()));
            for key in ["name", "rallySystemId", "status"] {
                object.insert(key.into(), event.json(key));
            }
            for (key, value) in &event.fields {
                object.entry(key.as_str()).or_insert_with(|| value.to_json());
            }

            let wanted = relation
                .get("checkpointIds")
                .and_then(Value::as_array)
                .unwrap_or_default();
            let mut checkpoints = Vec::new();
            if !wanted.is_empty() {
                for checkpoint in self
                    .store
                    .list(&path::event_collection(event_id, EVENT_CHECKPOINTS)?)
                    .await?
                {
                    if wanted.contains(&Value::from(checkpoint.id.as_str())) {
                        checkpoints.push(checkpoint_entry(&checkpoint));
                    }
                }
            }
            object.insert("checkpoints".into(), Json::Array(checkpoints));
            events.push(Json::Object(object));
        }
        Ok(events)
    }

    /// Create a user from the accepted keys of `body` and return its id.
    /// Timestamps are set here, never taken from the body.
    pub async fn create_user(&self, body: &Json) -> Result<String, ServiceError> {
        let object = body_object(body)?;

        let mut fields: Fields = USER_KEYS
            .iter()
            .filter_map(|key| object.get(*key).map(|v| (key.to_string(), Value::from_json(v))))
            .collect();
        let timestamp = now();
        fields.insert("createdAt".into(), Value::Timestamp(timestamp));
        fields.insert("updatedAt".into(), Value::Timestamp(timestamp));

        let id = self.store.create(&path::users()?, fields).await?;
        info!(user_id = %id, "User created");
        Ok(id)
    }
}

fn checkpoint_entry(checkpoint: &Document) -> Json {
    let mut object = Map::new();
    object.insert("id".into(), Json::from(checkpoint.id.as_str()));
    for key in ["name", "type", "status"] {
        object.insert(key.into(), checkpoint.json(key));
    }
    for (key, value) in &checkpoint.fields {
        object.entry(key.as_str()).or_insert_with(|| value.to_json());
    }
    Json::Object(object)
}
