//! Shared catalog handlers: `/api/catalogs/{vehicle|year|color}`.
//!
//! The catalog name is resolved before the body is read, so an unknown
//! catalog is a 404 whatever the body holds.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::Value as JsonValue;

use super::{json_body, ApiError, AppState, RequestParams};
use crate::model::CatalogKind;
use crate::server::auth::Caller;
use crate::store::DocumentStore;

fn catalog_kind(params: &RequestParams) -> Result<CatalogKind, ApiError> {
    Ok(params.required("catalog")?.parse::<CatalogKind>()?)
}

/// `GET`: every item of the catalog.
pub async fn list_catalog_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
) -> Result<Json<Vec<JsonValue>>, ApiError> {
    let kind = catalog_kind(&params)?;
    Ok(Json(state.service.list_catalog(kind).await?))
}

/// `POST`: create items atomically; 201 with the new ids in input order.
pub async fn create_catalog_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
    body: Bytes,
) -> Result<(StatusCode, Json<Vec<String>>), ApiError> {
    let kind = catalog_kind(&params)?;
    let body = json_body(&body)?;
    let ids = state.service.create_catalog_items(kind, &body).await?;
    Ok((StatusCode::CREATED, Json(ids)))
}

/// `PUT`: update existing items atomically; 204.
pub async fn update_catalog_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let kind = catalog_kind(&params)?;
    let body = json_body(&body)?;
    state.service.update_catalog_items(kind, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE`: delete items by id atomically; 204.
pub async fn delete_catalog_handler<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    _caller: Caller,
    params: RequestParams,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let kind = catalog_kind(&params)?;
    let body = json_body(&body)?;
    state.service.delete_catalog_items(kind, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}
