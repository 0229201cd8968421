//! Typed document values.
//!
//! Documents hold store-native values rather than raw JSON so that
//! timestamps survive a round trip through the store and integers keep
//! their type. Responses are rendered with [`Value::to_json`], which turns
//! every timestamp into an RFC 3339 string in UTC.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Number, Value as Json};

/// Field map of a document (or of a nested map value).
pub type Fields = BTreeMap<String, Value>;

/// A single document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    /// Base64 payload, kept encoded.
    Bytes(String),
    /// Full resource name of another document.
    Reference(String),
    GeoPoint { latitude: f64, longitude: f64 },
    Array(Vec<Value>),
    Map(Fields),
}

/// Current time at the precision the store keeps (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Render a timestamp the way every response does.
pub fn render_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of a numeric value. Doubles qualify only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Array membership using query equality.
    pub fn contains(&self, needle: &Value) -> bool {
        self.as_array()
            .map(|values| values.iter().any(|v| v.query_eq(needle)))
            .unwrap_or(false)
    }

    /// Equality as a store query sees it: integers and doubles compare by
    /// numeric value.
    pub fn query_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Double(b)) | (Value::Double(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            _ => self == other,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Double(_) => 2,
            Value::Timestamp(_) => 3,
            Value::String(_) => 4,
            Value::Bytes(_) => 5,
            Value::Reference(_) => 6,
            Value::GeoPoint { .. } => 7,
            Value::Array(_) => 8,
            Value::Map(_) => 9,
        }
    }

    /// Total order used for `order_by`: values of different types sort by
    /// type first (null, bool, number, timestamp, string, bytes, reference,
    /// geo point, array, map).
    pub fn query_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(_) | Value::Double(_), Value::Integer(_) | Value::Double(_)) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::String(a), Value::String(b))
            | (Value::Bytes(a), Value::Bytes(b))
            | (Value::Reference(a), Value::Reference(b)) => a.cmp(b),
            (
                Value::GeoPoint {
                    latitude: a_lat,
                    longitude: a_lng,
                },
                Value::GeoPoint {
                    latitude: b_lat,
                    longitude: b_lng,
                },
            ) => a_lat.total_cmp(b_lat).then(a_lng.total_cmp(b_lng)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.query_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => a.len().cmp(&b.len()),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Plain-text rendering used where a response field is always a string
    /// (pilot numbers, bib numbers). Null renders as an empty string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Timestamp(ts) => render_timestamp(ts),
            Value::String(s) | Value::Bytes(s) | Value::Reference(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }

    /// Convert to response JSON.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Double(d) => Number::from_f64(*d).map(Json::Number).unwrap_or(Json::Null),
            Value::Timestamp(ts) => Json::String(render_timestamp(ts)),
            Value::String(s) | Value::Bytes(s) | Value::Reference(s) => Json::String(s.clone()),
            Value::GeoPoint {
                latitude,
                longitude,
            } => serde_json::json!({ "latitude": latitude, "longitude": longitude }),
            Value::Array(values) => Json::Array(values.iter().map(Value::to_json).collect()),
            Value::Map(fields) => Json::Object(fields_to_json(fields)),
        }
    }

    /// Convert request JSON into a storable value. Strings stay strings;
    /// timestamps are only ever produced server side.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Double(n.as_f64().unwrap_or(0.0)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(values) => Value::Array(values.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Value::Map(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Convert a field map into a JSON object.
pub fn fields_to_json(fields: &Fields) -> Map<String, Json> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Resolve a dotted field path (`competitionCategory.registrationCategory`).
pub fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

// =============================================================================
// Document
// =============================================================================

/// A stored document: its id (last path segment) and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Field lookup; accepts dotted paths into nested maps.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.fields, path)
    }

    pub fn str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// True only for a stored boolean `true`.
    pub fn flag(&self, path: &str) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Field converted to JSON, `null` when absent.
    pub fn json(&self, path: &str) -> Json {
        self.get(path).map(Value::to_json).unwrap_or(Json::Null)
    }

    /// All fields as a JSON object, with the document id under `id`.
    pub fn to_json(&self) -> Json {
        let mut object = fields_to_json(&self.fields);
        object.insert("id".to_string(), Json::String(self.id.clone()));
        Json::Object(object)
    }
}
