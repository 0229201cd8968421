//! Event listing and detail.

use axum::{extract::State, Json};
use serde_json::Value as JsonValue;

use super::{ApiError, AppState, RequestParams};
use crate::server::auth::Caller;
use crate::service::{EventsPage, DEFAULT_EVENTS_PAGE_SIZE, MAX_EVENTS_PAGE_SIZE};
use crate::store::DocumentStore;

/// List events, newest first.
///
/// # Endpoint
///
/// `GET /api/events?size=50&lastDocId=...` or `GET /api/events?size=50&page=2`
///
/// # Query Parameters
///
/// - `size`: events per page, default 50. Values below 1 fall back to the
///   default and values above 100 are clamped.
/// - `lastDocId`: id of the last event of the previous page. Takes
///   precedence over `page`.
/// - `page`: 1-based page number, default 1.
///
/// # Response
///
/// A bare array of event fields. A short or empty page means the listing
/// is exhausted. Non-integer `size` or `page` gives 400.
pub async fn list_events_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vec<JsonValue>>, ApiError> {
    let size = match integer_param(&params, "size")? {
        Some(size) if size >= 1 => usize::try_from(size)
            .unwrap_or(MAX_EVENTS_PAGE_SIZE)
            .min(MAX_EVENTS_PAGE_SIZE),
        _ => DEFAULT_EVENTS_PAGE_SIZE,
    };
    let page = match params.optional("lastDocId") {
        Some(last_doc_id) => EventsPage::After(last_doc_id),
        None => {
            let number = integer_param(&params, "page")?.unwrap_or(1).max(1);
            EventsPage::Number(usize::try_from(number).unwrap_or(1))
        }
    };

    Ok(Json(state.service.list_events(size, &page).await?))
}

fn integer_param(params: &RequestParams, name: &str) -> Result<Option<i64>, ApiError> {
    params
        .optional(name)
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("{} must be an integer", name)))
        })
        .transpose()
}

/// `GET /api/event-detail/{eventId}`: the event's public content, or 404.
pub async fn event_detail_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<JsonValue>, ApiError> {
    let event_id = params.required("eventId")?;
    Ok(Json(state.service.event_detail(&event_id).await?))
}
