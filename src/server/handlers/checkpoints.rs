//! Race days, event checkpoints and competitor tracking.

use axum::{body::Bytes, extract::State, Json};
use serde_json::Value as JsonValue;

use super::{json_body, ApiError, AppState, RequestParams, SuccessResponse};
use crate::model::{CompetitorTrackingView, StatusChange, StatusUpdate, TrackedCompetitor};
use crate::server::auth::Caller;
use crate::store::DocumentStore;

/// `GET /api/days-of-race/{eventId}`: every day of the event, possibly none.
pub async fn days_of_race_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vec<JsonValue>>, ApiError> {
    let event_id = params.required("eventId")?;
    Ok(Json(state.service.days_of_race(&event_id).await?))
}

/// `GET /api/checkpoint/dayofrace/active/{eventId}`: the active day, or 404.
pub async fn active_day_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<JsonValue>, ApiError> {
    let event_id = params.required("eventId")?;
    Ok(Json(state.service.active_day_of_race(&event_id).await?))
}

/// `GET /api/checkpoint/{checkpointId}/event/{eventId}`
pub async fn checkpoint_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<JsonValue>, ApiError> {
    let checkpoint_id = params.required("checkpointId")?;
    let event_id = params.required("eventId")?;
    Ok(Json(
        state
            .service
            .event_checkpoint(&event_id, &checkpoint_id)
            .await?,
    ))
}

/// Competitors as seen at one checkpoint.
///
/// # Endpoint
///
/// `GET /api/competitor-tracking/{eventId}/{dayOfRaceId}/{checkpointId}`
///
/// # Response
///
/// `{"competitors": [...], "routeName": string | null}`. Competitors hidden
/// by their status at this checkpoint type are left out.
pub async fn competitor_tracking_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<CompetitorTrackingView>, ApiError> {
    let event_id = params.required("eventId")?;
    let day_of_race_id = params.required("dayOfRaceId")?;
    let checkpoint_id = params.required("checkpointId")?;

    let view = state
        .service
        .competitor_tracking(&event_id, &day_of_race_id, &checkpoint_id)
        .await?;
    Ok(Json(view))
}

/// `GET /api/all-competitor-tracking/{eventId}/{dayOfRaceId}`
pub async fn all_competitor_tracking_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vec<TrackedCompetitor>>, ApiError> {
    let event_id = params.required("eventId")?;
    let day_of_race_id = params.required("dayOfRaceId")?;
    Ok(Json(
        state
            .service
            .all_competitor_tracking(&event_id, &day_of_race_id)
            .await?,
    ))
}

/// Record a competitor status and propagate it to later checkpoints.
///
/// # Endpoint
///
/// `PUT /api/change-competitor-status`
///
/// # Request Body
///
/// `{eventId, dayOfRaceId, checkpointId, orderCheckpoint, competitorId,
/// status, lastStatusCompetitor, checkpointName, note?}`
///
/// # Response
///
/// `{"success": true}`. A stored checkpoint order different from
/// `orderCheckpoint` is a 400.
pub async fn change_status_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let change = StatusChange::from_json(&json_body(&body)?)?;
    state.service.change_competitor_status(&change).await?;
    Ok(SuccessResponse::ok())
}

/// Set the status of a single checkpoint.
///
/// # Endpoint
///
/// `PUT /api/update-competitor-status/{eventId}/{dayOfRaceId}/{competitorId}/{checkpointId}`
///
/// # Request Body
///
/// `{status, checkpointDisableName?, note?}`; `checkpointDisableName` is
/// required for out statuses.
pub async fn update_status_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let event_id = params.required("eventId")?;
    let day_of_race_id = params.required("dayOfRaceId")?;
    let competitor_id = params.required("competitorId")?;
    let checkpoint_id = params.required("checkpointId")?;
    let update = StatusUpdate::from_json(&json_body(&body)?)?;

    state
        .service
        .update_competitor_status(
            &event_id,
            &day_of_race_id,
            &competitor_id,
            &checkpoint_id,
            &update,
        )
        .await?;
    Ok(SuccessResponse::ok())
}
