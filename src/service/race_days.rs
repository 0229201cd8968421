use serde_json::Value as Json;

use super::RaceService;
use crate::error::ServiceError;
use crate::store::path::{self, DAY_OF_RACES, EVENT_CHECKPOINTS};
use crate::store::{DocumentStore, Filter, Query};

impl<S: DocumentStore> RaceService<S> {
    /// Every day of race of an event; empty when there are none.
    pub async fn days_of_race(&self, event_id: &str) -> Result<Vec<Json>, ServiceError> {
        let days = self
            .store
            .list(&path::event_collection(event_id, DAY_OF_RACES)?)
            .await?;
        Ok(days.iter().map(|day| day.to_json()).collect())
    }

    /// The first day of race flagged `isActivate`.
    pub async fn active_day_of_race(&self, event_id: &str) -> Result<Json, ServiceError> {
        let days = self
            .store
            .query(
                &path::event_collection(event_id, DAY_OF_RACES)?,
                &Query::new().filter(Filter::eq("isActivate", true)).limit(1),
            )
            .await?;
        days.first()
            .map(|day| day.to_json())
            .ok_or_else(|| ServiceError::not_found(format!("active day of race for event {}", event_id)))
    }

    pub async fn event_checkpoint(
        &self,
        event_id: &str,
        checkpoint_id: &str,
    ) -> Result<Json, ServiceError> {
        let checkpoint = self
            .require(
                &path::event_collection(event_id, EVENT_CHECKPOINTS)?.doc(checkpoint_id)?,
                "checkpoint",
            )
            .await?;
        Ok(checkpoint.to_json())
    }
}
