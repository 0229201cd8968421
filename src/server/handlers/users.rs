//! Staff profiles and user creation.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::Value as JsonValue;

use super::{json_body, ApiError, AppState, CreatedResponse, RequestParams};
use crate::server::auth::Caller;
use crate::store::DocumentStore;

/// Profile of a staff user.
///
/// # Endpoint
///
/// `GET /api/user-profile?userId=...`
///
/// `userId` is the identity-provider uid (`authUserId`), not the user
/// document id.
pub async fn user_profile_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<JsonValue>, ApiError> {
    let auth_user_id = params.required("userId")?;
    Ok(Json(state.service.user_profile(&auth_user_id).await?))
}

/// `POST /api/users`: 201 with `{"id": "<document id>"}`.
pub async fn create_user_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let body = json_body(&body)?;
    let id = state.service.create_user(&body).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
