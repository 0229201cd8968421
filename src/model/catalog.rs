//! Shared catalogs under `catalogs/default`: vehicle brands, model years
//! and colors.

use std::str::FromStr;

use serde_json::{json, Map, Value as Json};

use super::{body_object, trimmed_string};
use crate::error::ServiceError;
use crate::store::{Document, Fields, Value};

/// Oldest accepted catalog year.
pub const MIN_CATALOG_YEAR: i64 = 1894;

/// Newest accepted catalog year.
pub const MAX_CATALOG_YEAR: i64 = 2100;

/// Which catalog a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Vehicle,
    Year,
    Color,
}

impl FromStr for CatalogKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vehicle" => Ok(CatalogKind::Vehicle),
            "year" => Ok(CatalogKind::Year),
            "color" => Ok(CatalogKind::Color),
            other => Err(ServiceError::not_found(format!("catalog {}", other))),
        }
    }
}

impl CatalogKind {
    /// Subcollection name under `catalogs/default`.
    pub fn collection(&self) -> &'static str {
        match self {
            CatalogKind::Vehicle => "vehicles",
            CatalogKind::Year => "years",
            CatalogKind::Color => "colors",
        }
    }

    /// Validate one item and return the fields to store.
    pub fn validate_item(&self, item: &Json) -> Result<Fields, ServiceError> {
        let object = body_object(item)?;
        let mut fields = Fields::new();

        match self {
            CatalogKind::Vehicle => {
                fields.insert("name".into(), trimmed_string(object, "name")?.into());
                fields.insert("models".into(), Value::Array(vehicle_models(object)?));
                match object.get("logoUrl") {
                    None | Some(Json::Null) => {}
                    Some(Json::String(url)) => {
                        fields.insert("logoUrl".into(), url.trim().into());
                    }
                    Some(_) => return Err(ServiceError::bad_request("logoUrl must be a string")),
                }
            }
            CatalogKind::Year => {
                let year = match object.get("year") {
                    Some(Json::Number(n)) => n.as_i64(),
                    Some(Json::String(s)) => s.trim().parse().ok(),
                    _ => None,
                }
                .ok_or_else(|| ServiceError::bad_request("year must be an integer"))?;
                if !(MIN_CATALOG_YEAR..=MAX_CATALOG_YEAR).contains(&year) {
                    return Err(ServiceError::bad_request(format!(
                        "year must be between {} and {}",
                        MIN_CATALOG_YEAR, MAX_CATALOG_YEAR
                    )));
                }
                fields.insert("year".into(), Value::Integer(year));
            }
            CatalogKind::Color => {
                fields.insert("name".into(), trimmed_string(object, "name")?.into());
                fields.insert("hex".into(), trimmed_string(object, "hex")?.into());
            }
        }
        Ok(fields)
    }

    /// Render a stored item.
    pub fn render(&self, doc: &Document) -> Json {
        match self {
            CatalogKind::Vehicle => {
                let models = match doc.json("models") {
                    Json::Null => json!([]),
                    other => other,
                };
                json!({
                    "id": doc.id,
                    "name": doc.str("name").unwrap_or_default(),
                    "models": models,
                    "logoUrl": doc.json("logoUrl"),
                })
            }
            CatalogKind::Year => json!({
                "id": doc.id,
                "year": doc.json("year"),
            }),
            CatalogKind::Color => json!({
                "id": doc.id,
                "name": doc.str("name").unwrap_or_default(),
                "hex": doc.str("hex").unwrap_or_default(),
            }),
        }
    }
}

fn vehicle_models(object: &Map<String, Json>) -> Result<Vec<Value>, ServiceError> {
    match object.get("models") {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::Array(models)) => models
            .iter()
            .map(|m| {
                m.as_str()
                    .map(|s| Value::from(s.trim()))
                    .ok_or_else(|| ServiceError::bad_request("models must contain strings"))
            })
            .collect(),
        Some(_) => Err(ServiceError::bad_request("models must be an array")),
    }
}

/// Require a non-empty JSON array body (bulk catalog operations).
pub fn bulk_items(body: &Json) -> Result<&[Json], ServiceError> {
    match body.as_array() {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(ServiceError::bad_request("body must be a non-empty array")),
    }
}
