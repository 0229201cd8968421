use serde_json::Value as Json;
use tracing::{debug, info};

use super::RaceService;
use crate::error::ServiceError;
use crate::model::tracking::DEFAULT_CHECKPOINT_TYPE;
use crate::model::{
    is_competitor_visible, CompetitorStatus, CompetitorTrackingView, StatusChange, StatusUpdate,
    TrackedCompetitor, TrackingCheckpointView,
};
use crate::store::value::{now, render_timestamp};
use crate::store::{path, DocumentStore, Fields, Filter, Query, Value, Write};

impl<S: DocumentStore> RaceService<S> {
    /// Competitors of a race day as seen at one checkpoint, plus the name of
    /// the route through that checkpoint.
    ///
    /// Competitors without a document for the checkpoint are skipped. The
    /// visibility rule is evaluated against the type of the first checkpoint
    /// document read, since all competitors share the checkpoint.
    pub async fn competitor_tracking(
        &self,
        event_id: &str,
        day_of_race_id: &str,
        checkpoint_id: &str,
    ) -> Result<CompetitorTrackingView, ServiceError> {
        let competitors = self
            .store
            .list(&path::tracking_competitors(event_id, day_of_race_id)?)
            .await?;

        let queried_at = Json::String(render_timestamp(&now()));
        let mut checkpoint_type: Option<String> = None;
        let mut tracked = Vec::new();

        for competitor in &competitors {
            let checkpoint_path =
                path::tracking_checkpoints(event_id, day_of_race_id, &competitor.id)?.doc(checkpoint_id)?;
            let Some(checkpoint) = self.store.get(&checkpoint_path).await? else {
                debug!(competitor_id = %competitor.id, "Competitor has no such checkpoint");
                continue;
            };

            let view = TrackingCheckpointView::from(&checkpoint);
            if checkpoint_type.is_none() {
                checkpoint_type = Some(view.checkpoint_type.clone());
            }

            let mut entry = TrackedCompetitor::from_tracking(competitor, vec![view]);
            entry.created_at = queried_at.clone();
            entry.updated_at = queried_at.clone();
            tracked.push(entry);
        }

        if tracked.is_empty() {
            return Ok(CompetitorTrackingView {
                competitors: Vec::new(),
                route_name: None,
            });
        }

        let checkpoint_type = checkpoint_type.unwrap_or_else(|| DEFAULT_CHECKPOINT_TYPE.to_string());
        tracked.retain(|competitor| {
            competitor
                .tracking_checkpoints
                .first()
                .map(|cp| is_competitor_visible(&cp.status_competitor, &checkpoint_type))
                .unwrap_or(true)
        });

        let routes = self
            .store
            .query(
                &path::tracking_routes(event_id, day_of_race_id)?,
                &Query::new()
                    .filter(Filter::array_contains("checkpointIds", checkpoint_id))
                    .limit(1),
            )
            .await?;
        let route_name = routes
            .first()
            .and_then(|route| route.str("name"))
            .map(str::to_string);

        Ok(CompetitorTrackingView {
            competitors: tracked,
            route_name,
        })
    }

    /// Every competitor of a race day with all of its checkpoints.
    pub async fn all_competitor_tracking(
        &self,
        event_id: &str,
        day_of_race_id: &str,
    ) -> Result<Vec<TrackedCompetitor>, ServiceError> {
        let competitors = self
            .store
            .list(&path::tracking_competitors(event_id, day_of_race_id)?)
            .await?;

        let mut tracked = Vec::with_capacity(competitors.len());
        for competitor in &competitors {
            let checkpoints = self
                .store
                .list(&path::tracking_checkpoints(event_id, day_of_race_id, &competitor.id)?)
                .await?;
            let views = checkpoints.iter().map(TrackingCheckpointView::from).collect();
            tracked.push(TrackedCompetitor::from_tracking(competitor, views));
        }
        Ok(tracked)
    }

    /// Record a status at a checkpoint and propagate it along the route.
    ///
    /// The target checkpoint and every later checkpoint (greater `order`)
    /// are written in one commit. An out status is copied forward. A
    /// competitor coming back from an out status has the later checkpoints
    /// reset to `none`.
    pub async fn change_competitor_status(&self, change: &StatusChange) -> Result<(), ServiceError> {
        let event_id = change.event_id.as_str();
        let day_id = change.day_of_race_id.as_str();
        let competitor_id = change.competitor_id.as_str();

        self.require(
            &path::tracking_competitors(event_id, day_id)?.doc(competitor_id)?,
            "tracking competitor",
        )
        .await?;
        let checkpoints = path::tracking_checkpoints(event_id, day_id, competitor_id)?;
        let target_path = checkpoints.doc(&change.checkpoint_id)?;
        let target = self.require(&target_path, "tracking checkpoint").await?;

        if let Some(stored) = target.i64("order") {
            if stored != change.order_checkpoint {
                return Err(ServiceError::bad_request(format!(
                    "checkpoint order is {}, request says {}",
                    stored, change.order_checkpoint
                )));
            }
        }

        let timestamp = now();
        let mut writes = vec![Write::Update {
            path: target_path,
            fields: status_fields(
                change.status,
                &change.checkpoint_id,
                &change.checkpoint_name,
                change.note.as_deref(),
                Some(timestamp),
            ),
        }];

        let propagate = change.status.is_out();
        let reset = !propagate && change.last_status.is_out();
        if propagate || reset {
            for later in self.store.list(&checkpoints).await? {
                if !later.i64("order").is_some_and(|order| order > change.order_checkpoint) {
                    continue;
                }
                let mut fields = if propagate {
                    status_fields(
                        change.status,
                        &change.checkpoint_id,
                        &change.checkpoint_name,
                        change.note.as_deref(),
                        None,
                    )
                } else {
                    status_fields(CompetitorStatus::None, "", "", None, None)
                };
                fields.insert("updatedAt".into(), Value::Timestamp(timestamp));
                writes.push(Write::Update {
                    path: checkpoints.doc(&later.id)?,
                    fields,
                });
            }
        }

        let count = writes.len();
        self.store.commit(writes).await?;
        info!(
            competitor_id = competitor_id,
            checkpoint_id = %change.checkpoint_id,
            status = %change.status,
            checkpoints = count,
            "Competitor status changed"
        );
        Ok(())
    }

    /// Set the status of a single checkpoint.
    pub async fn update_competitor_status(
        &self,
        event_id: &str,
        day_of_race_id: &str,
        competitor_id: &str,
        checkpoint_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), ServiceError> {
        let checkpoint_path =
            path::tracking_checkpoints(event_id, day_of_race_id, competitor_id)?.doc(checkpoint_id)?;
        self.require(&checkpoint_path, "tracking checkpoint").await?;

        let fields = status_fields(
            update.status,
            checkpoint_id,
            update.checkpoint_disable_name.as_deref().unwrap_or_default(),
            update.note.as_deref(),
            Some(now()),
        );
        self.store.update(&checkpoint_path, fields).await?;
        info!(
            competitor_id = competitor_id,
            checkpoint_id = checkpoint_id,
            status = %update.status,
            "Competitor status updated"
        );
        Ok(())
    }
}

/// Fields written for a status. Out statuses record the disabling
/// checkpoint; any other status clears it. `pass_time` also stamps
/// `updatedAt`.
fn status_fields(
    status: CompetitorStatus,
    disable_id: &str,
    disable_name: &str,
    note: Option<&str>,
    pass_time: Option<chrono::DateTime<chrono::Utc>>,
) -> Fields {
    let mut fields = Fields::new();
    fields.insert("statusCompetitor".into(), status.as_str().into());
    if status.is_out() {
        fields.insert("checkpointDisable".into(), disable_id.into());
        fields.insert("checkpointDisableName".into(), disable_name.into());
    } else {
        fields.insert("checkpointDisable".into(), Value::Null);
        fields.insert("checkpointDisableName".into(), Value::Null);
    }
    if let Some(note) = note {
        fields.insert("note".into(), note.into());
    }
    if let Some(ts) = pass_time {
        fields.insert("passTime".into(), Value::Timestamp(ts));
        fields.insert("updatedAt".into(), Value::Timestamp(ts));
    }
    fields
}
