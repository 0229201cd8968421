//! Competitor lookups and registration.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use super::{json_body, ApiError, AppState, CreatedResponse, RequestParams};
use crate::model::{Competitor, CompetitorRoute, CompetitorUserCreated};
use crate::server::auth::Caller;
use crate::store::DocumentStore;

/// Resolve the route a competitor rides on a race day.
///
/// # Endpoint
///
/// `GET /api/competitor-route/{eventId}/{dayId}/{competitorId}`
///
/// The three ids may also be query parameters.
///
/// # Response
///
/// `{"competitor": {...}, "route": {...}}`. Every failed step of the lookup
/// chain (unavailable participant, inactive day, unknown category, no route)
/// is a 404.
pub async fn competitor_route_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<CompetitorRoute>, ApiError> {
    let event_id = params.required("eventId")?;
    let day_id = params.required("dayId")?;
    let competitor_id = params.required("competitorId")?;

    let resolved = state
        .service
        .competitor_route(&event_id, &day_id, &competitor_id)
        .await?;
    Ok(Json(resolved))
}

/// `GET /api/get-competitor-by-id/{eventId}/{competitorId}`
pub async fn competitor_by_id_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Competitor>, ApiError> {
    let event_id = params.required("eventId")?;
    let competitor_id = params.required("competitorId")?;
    Ok(Json(
        state
            .service
            .competitor_by_id(&event_id, &competitor_id)
            .await?,
    ))
}

/// List an event's competitors, newest registration first.
///
/// # Endpoint
///
/// `GET /api/get-competitors-by-event/{eventId}?category=...&team=...`
///
/// `category` and `team` are optional equality filters.
pub async fn competitors_by_event_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vec<Competitor>>, ApiError> {
    let event_id = params.required("eventId")?;
    let category = params.optional("category");
    let team = params.optional("team");

    let competitors = state
        .service
        .competitors_by_event(&event_id, category.as_deref(), team.as_deref())
        .await?;
    Ok(Json(competitors))
}

/// Register an existing user in an event.
///
/// # Endpoint
///
/// `POST /api/create-competitor`
///
/// # Request Body
///
/// `{"userId", "eventId", "competitionCategory": {"pilotNumber",
/// "registrationCategory"}, "registrationDate"?, "team"?}`. `competition`
/// is accepted in place of `competitionCategory`.
///
/// # Response
///
/// 201 with `{"id"}`, the user id, which is also the participant id.
/// 404 for an unknown user or event, 409 when the user is already
/// registered or the pilot number is taken.
pub async fn create_competitor_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let body = json_body(&body)?;
    let id = state.service.create_competitor(&body).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Create a competitor account and register it in an event.
///
/// # Endpoint
///
/// `POST /api/create-competitor-user`
///
/// # Request Body
///
/// `{"email", "username", "personalData", "healthData"?,
/// "emergencyContacts": [...], "vehicleData"?, "competition": {"eventId",
/// "pilotNumber", "registrationCategory", "team"}}`
///
/// # Response
///
/// 201 with `{"id", "membershipId"}`. 409 when the email, the username or
/// the pilot number is taken.
pub async fn create_competitor_user_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    body: Bytes,
) -> Result<(StatusCode, Json<CompetitorUserCreated>), ApiError> {
    let body = json_body(&body)?;
    let created = state.service.create_competitor_user(&body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `DELETE /api/delete-competitor-user` with `{"userId" | "email", "eventId"}`.
///
/// Answers 204 once the account and its registration are gone.
pub async fn delete_competitor_user_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let body = json_body(&body)?;
    state.service.delete_competitor_user(&body).await?;
    Ok(StatusCode::NO_CONTENT)
}
