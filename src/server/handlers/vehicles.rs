//! Garage handlers: a user's vehicles.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use super::{json_body, ApiError, AppState, RequestParams};
use crate::model::vehicle::{check_year, parse_year};
use crate::model::{Vehicle, VehicleInput};
use crate::server::auth::Caller;
use crate::store::DocumentStore;

/// List a user's vehicles.
///
/// # Endpoint
///
/// `GET /api/vehicles?userId=...`
///
/// # Response
///
/// JSON array of vehicles; 404 when the user does not exist.
pub async fn list_vehicles_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let user_id = params.required("userId")?;
    Ok(Json(state.service.list_vehicles(&user_id).await?))
}

/// Fetch one vehicle.
///
/// # Endpoint
///
/// `GET /api/vehicles/{vehicleId}?userId=...`
pub async fn get_vehicle_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vehicle>, ApiError> {
    let user_id = params.required("userId")?;
    let vehicle_id = params.required("vehicleId")?;
    Ok(Json(state.service.get_vehicle(&user_id, &vehicle_id).await?))
}

/// Add a vehicle to a user's garage.
///
/// # Endpoint
///
/// `POST /api/vehicles?userId=...&authUserId=...`
///
/// # Request Body
///
/// `{"branch", "model", "color", "year"}`
///
/// # Response
///
/// 201 with the created vehicle. `createdAt` equals `updatedAt`.
pub async fn create_vehicle_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
    body: Bytes,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    let user_id = params.required("userId")?;
    let auth_user_id = params.required("authUserId")?;
    let input = VehicleInput::from_json(&json_body(&body)?)?;

    let vehicle = state
        .service
        .create_vehicle(&user_id, &auth_user_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Replace a vehicle's editable fields.
///
/// # Endpoint
///
/// `PUT /api/vehicles/{vehicleId}?userId=...&authUserId=...`
/// (`vehicleId` may also be a query parameter)
pub async fn update_vehicle_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
    body: Bytes,
) -> Result<Json<Vehicle>, ApiError> {
    let user_id = params.required("userId")?;
    let auth_user_id = params.required("authUserId")?;
    let vehicle_id = params.required("vehicleId")?;
    let input = VehicleInput::from_json(&json_body(&body)?)?;

    let vehicle = state
        .service
        .update_vehicle(&user_id, &auth_user_id, &vehicle_id, &input)
        .await?;
    Ok(Json(vehicle))
}

/// Delete a vehicle. 204 on success.
pub async fn delete_vehicle_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<StatusCode, ApiError> {
    let user_id = params.required("userId")?;
    let auth_user_id = params.required("authUserId")?;
    let vehicle_id = params.required("vehicleId")?;

    state
        .service
        .delete_vehicle(&user_id, &auth_user_id, &vehicle_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Find a user's vehicle by brand, model and year.
///
/// # Endpoint
///
/// `GET /api/search-vehicle?userId=...&branch=...&model=...&year=...`
///
/// A year outside 1900..=2100 is a 400, checked before any lookup.
pub async fn search_vehicle_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vehicle>, ApiError> {
    let user_id = params.required("userId")?;
    let branch = params.required("branch")?;
    let model = params.required("model")?;
    let raw_year = params.required("year")?;

    let year = parse_year(&raw_year)
        .ok_or_else(|| ApiError::BadRequest(format!("year is not an integer: {}", raw_year)))?;
    check_year(year)?;

    let vehicle = state
        .service
        .search_vehicle(&user_id, &branch, &model, year)
        .await?;
    Ok(Json(vehicle))
}
