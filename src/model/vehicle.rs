//! User vehicles.

use serde::Serialize;
use serde_json::Value as Json;

use super::{body_object, trimmed_string};
use crate::error::ServiceError;
use crate::store::{Document, Fields, Value};

/// Oldest accepted vehicle model year.
pub const MIN_VEHICLE_YEAR: i64 = 1900;

/// Newest accepted vehicle model year.
pub const MAX_VEHICLE_YEAR: i64 = 2100;

/// Validated body of a vehicle create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleInput {
    pub branch: String,
    pub model: String,
    pub color: String,
    pub year: i64,
}

impl VehicleInput {
    /// Validate `{branch, model, color, year}`. Strings are trimmed and must
    /// stay non-empty; `year` may be an integer or an integral string.
    pub fn from_json(body: &Json) -> Result<Self, ServiceError> {
        let object = body_object(body)?;

        let year = object
            .get("year")
            .and_then(json_year)
            .ok_or_else(|| ServiceError::bad_request("year must be an integer"))?;
        check_year(year)?;

        Ok(Self {
            branch: trimmed_string(object, "branch")?,
            model: trimmed_string(object, "model")?,
            color: trimmed_string(object, "color")?,
            year,
        })
    }

    /// Fields written to the store (timestamps excluded).
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("branch".into(), self.branch.clone().into());
        fields.insert("model".into(), self.model.clone().into());
        fields.insert("color".into(), self.color.clone().into());
        fields.insert("year".into(), Value::Integer(self.year));
        fields
    }
}

fn json_year(value: &Json) -> Option<i64> {
    match value {
        Json::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Json::String(s) => parse_year(s),
        _ => None,
    }
}

/// Parse a year from a query parameter.
pub fn parse_year(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Reject years outside the accepted range.
pub fn check_year(year: i64) -> Result<(), ServiceError> {
    if !(MIN_VEHICLE_YEAR..=MAX_VEHICLE_YEAR).contains(&year) {
        return Err(ServiceError::bad_request(format!(
            "year must be between {} and {}",
            MIN_VEHICLE_YEAR, MAX_VEHICLE_YEAR
        )));
    }
    Ok(())
}

/// A vehicle as returned by the API.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub branch: Json,
    pub year: Json,
    pub model: Json,
    pub color: Json,
    pub created_at: Json,
    pub updated_at: Json,
}

impl From<&Document> for Vehicle {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            branch: doc.json("branch"),
            year: doc.json("year"),
            model: doc.json("model"),
            color: doc.json("color"),
            created_at: doc.json("createdAt"),
            updated_at: doc.json("updatedAt"),
        }
    }
}
