//! Firestore REST v1 backend.
//!
//! Talks to `https://firestore.googleapis.com` (or an emulator) with plain
//! HTTPS requests:
//!
//! | Operation | Request                                              |
//! |-----------|------------------------------------------------------|
//! | get       | `GET    {documents}/{path}`                          |
//! | list      | `GET    {documents}/{collection}?pageSize=..`        |
//! | query     | `POST   {documents}/{parent}:runQuery`               |
//! | commit    | `POST   {documents}:commit`                          |
//!
//! Document fields use Firestore's typed value encoding
//! (`{"stringValue": ".."}`, `{"integerValue": "42"}`, ...), which maps one
//! to one onto [`Value`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value as Json};
use tracing::{debug, warn};
use url::Url;

use super::path::{CollectionPath, DocPath};
use super::query::{Direction, Filter, FilterOp, Query};
use super::value::{render_timestamp, Document, Fields, Value};
use super::{DocumentStore, Write};
use crate::error::StoreError;

/// Default public Firestore endpoint.
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Default database id.
pub const DEFAULT_DATABASE: &str = "(default)";

/// Page size used when listing collections.
const LIST_PAGE_SIZE: &str = "300";

/// Token the Firestore emulator accepts as an administrator credential.
const EMULATOR_TOKEN: &str = "owner";

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for [`FirestoreStore`].
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Google Cloud project id
    pub project_id: String,

    /// Database id, usually `(default)`
    pub database: String,

    /// Endpoint: a full URL, or a bare `host:port` for the emulator
    pub endpoint: String,

    /// OAuth2 access token sent as a bearer credential
    pub access_token: Option<String>,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: DEFAULT_DATABASE.to_string(),
            endpoint: DEFAULT_FIRESTORE_ENDPOINT.to_string(),
            access_token: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// A bare `host:port` endpoint designates the local emulator.
    pub fn is_emulator(&self) -> bool {
        !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://")
    }

    /// Endpoint as a base URL (`scheme://host[:port]`).
    pub fn base_url(&self) -> Result<Url, StoreError> {
        let raw = if self.is_emulator() {
            format!("http://{}", self.endpoint)
        } else {
            self.endpoint.clone()
        };
        Url::parse(&raw).map_err(|e| StoreError::Connection(format!("Invalid endpoint {}: {}", raw, e)))
    }

    /// Resource name of the documents root.
    pub fn documents_name(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn bearer_token(&self) -> Option<&str> {
        match &self.access_token {
            Some(token) => Some(token),
            None if self.is_emulator() => Some(EMULATOR_TOKEN),
            None => None,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Document store backed by the Firestore REST API.
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
    /// `{base}/v1/projects/{p}/databases/{d}/documents`
    documents_url: String,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let base = config.base_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let documents_url = format!(
            "{}/v1/{}",
            base.as_str().trim_end_matches('/'),
            config.documents_name()
        );

        Ok(Self {
            client,
            config,
            documents_url,
        })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.config.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn doc_url(&self, path: &DocPath) -> String {
        format!("{}/{}", self.documents_url, encode_path(path.as_str()))
    }

    fn collection_url(&self, collection: &CollectionPath) -> String {
        format!("{}/{}", self.documents_url, encode_path(collection.as_str()))
    }

    /// URL of the resource a query on `collection` is issued against.
    fn query_url(&self, collection: &CollectionPath) -> String {
        match collection.parent() {
            Some(parent) => format!("{}:runQuery", self.doc_url(&parent)),
            None => format!("{}:runQuery", self.documents_url),
        }
    }

    fn doc_name(&self, path: &DocPath) -> String {
        format!("{}/{}", self.config.documents_name(), path)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        builder
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let response = self
            .send(self.request(Method::GET, &self.doc_url(path)))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let raw: RawDocument = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(decode_document(raw)?))
            }
            _ => Err(backend_error(response).await),
        }
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut builder = self
                .request(Method::GET, &url)
                .query(&[("pageSize", LIST_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token.as_str())]);
            }

            let response = self.send(builder).await?;
            if !response.status().is_success() {
                return Err(backend_error(response).await);
            }

            let page: ListDocumentsResponse = response
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;

            for raw in page.documents {
                documents.push(decode_document(raw)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(collection = %collection, count = documents.len(), "Listed collection");
        Ok(documents)
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let body = encode_query(&self.config.documents_name(), collection, query);
        let response = self
            .send(self.request(Method::POST, &self.query_url(collection)).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let rows: Vec<RunQueryResponse> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        rows.into_iter()
            .filter_map(|row| row.document)
            .map(decode_document)
            .collect()
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let encoded: Vec<Json> = writes
            .iter()
            .map(|write| encode_write(&self.doc_name(write.path()), write))
            .collect();
        let url = format!("{}:commit", self.documents_url);

        let response = self
            .send(self.request(Method::POST, &url).json(&json!({ "writes": encoded })))
            .await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(())
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Json>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

async fn backend_error(response: Response) -> StoreError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => format!("{} {}", envelope.error.status, envelope.error.message)
            .trim()
            .to_string(),
        Err(_) => text,
    };

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::CONFLICT => StoreError::AlreadyExists(message),
        _ => {
            warn!(status = status.as_u16(), "Firestore request failed: {}", message);
            StoreError::Backend {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// Value Codec
// =============================================================================

fn decode_document(raw: RawDocument) -> Result<Document, StoreError> {
    let id = raw
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(Document::new(id, decode_fields(&raw.fields)?))
}

fn decode_fields(fields: &Map<String, Json>) -> Result<Fields, StoreError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Decode one typed Firestore value.
pub fn decode_value(json: &Json) -> Result<Value, StoreError> {
    let invalid = || StoreError::Decode(format!("Invalid value: {}", json));

    let object = json.as_object().ok_or_else(invalid)?;
    let (kind, inner) = object.iter().next().ok_or_else(invalid)?;

    let value = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().ok_or_else(invalid)?),
        "integerValue" => {
            let parsed = match inner {
                Json::String(s) => s.parse::<i64>().ok(),
                Json::Number(n) => n.as_i64(),
                _ => None,
            };
            Value::Integer(parsed.ok_or_else(invalid)?)
        }
        "doubleValue" => match inner {
            Json::Number(n) => Value::Double(n.as_f64().ok_or_else(invalid)?),
            Json::String(s) => Value::Double(match s.as_str() {
                "NaN" => f64::NAN,
                "Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                _ => return Err(invalid()),
            }),
            _ => return Err(invalid()),
        },
        "timestampValue" => {
            let raw = inner.as_str().ok_or_else(invalid)?;
            let parsed = DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?;
            Value::Timestamp(parsed.with_timezone(&Utc))
        }
        "stringValue" => Value::String(inner.as_str().ok_or_else(invalid)?.to_string()),
        "bytesValue" => Value::Bytes(inner.as_str().ok_or_else(invalid)?.to_string()),
        "referenceValue" => Value::Reference(inner.as_str().ok_or_else(invalid)?.to_string()),
        "geoPointValue" => {
            let point = inner.as_object().ok_or_else(invalid)?;
            // Zero coordinates are omitted from the JSON encoding.
            let coordinate = |key: &str| match point.get(key) {
                None => Ok(0.0),
                Some(raw) => raw.as_f64().ok_or_else(invalid),
            };
            Value::GeoPoint {
                latitude: coordinate("latitude")?,
                longitude: coordinate("longitude")?,
            }
        }
        "arrayValue" => {
            let values = match inner.get("values").and_then(Json::as_array) {
                Some(values) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Value::Array(values)
        }
        "mapValue" => match inner.get("fields").and_then(Json::as_object) {
            Some(fields) => Value::Map(decode_fields(fields)?),
            None => Value::Map(Fields::new()),
        },
        other => {
            return Err(StoreError::Decode(format!("Unknown value type: {}", other)));
        }
    };
    Ok(value)
}

/// Encode a value into Firestore's typed representation.
pub fn encode_value(value: &Value) -> Json {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Integer(i) => json!({ "integerValue": i.to_string() }),
        Value::Double(d) => match Number::from_f64(*d) {
            Some(n) => json!({ "doubleValue": n }),
            None if d.is_nan() => json!({ "doubleValue": "NaN" }),
            None if *d > 0.0 => json!({ "doubleValue": "Infinity" }),
            None => json!({ "doubleValue": "-Infinity" }),
        },
        Value::Timestamp(ts) => json!({ "timestampValue": render_timestamp(ts) }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Bytes(b) => json!({ "bytesValue": b }),
        Value::Reference(r) => json!({ "referenceValue": r }),
        Value::GeoPoint {
            latitude,
            longitude,
        } => json!({ "geoPointValue": { "latitude": latitude, "longitude": longitude } }),
        Value::Array(values) => {
            json!({ "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

fn encode_fields(fields: &Fields) -> Map<String, Json> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Quote a field name for use in a field path when it is not a simple
/// identifier.
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn encode_write(name: &str, write: &Write) -> Json {
    match write {
        Write::Create { fields, .. } => json!({
            "update": { "name": name, "fields": encode_fields(fields) },
            "currentDocument": { "exists": false },
        }),
        Write::Update { fields, .. } => json!({
            "update": { "name": name, "fields": encode_fields(fields) },
            "updateMask": {
                "fieldPaths": fields.keys().map(|k| quote_field_path(k)).collect::<Vec<_>>(),
            },
            "currentDocument": { "exists": true },
        }),
        Write::Delete { .. } => json!({ "delete": name }),
    }
}

fn encode_filter(filter: &Filter) -> Json {
    let op = match filter.op {
        FilterOp::Equal => "EQUAL",
        FilterOp::ArrayContains => "ARRAY_CONTAINS",
    };
    json!({
        "fieldFilter": {
            "field": { "fieldPath": filter.field },
            "op": op,
            "value": encode_value(&filter.value),
        }
    })
}

fn encode_query(documents_name: &str, collection: &CollectionPath, query: &Query) -> Json {
    let mut structured = Map::new();
    structured.insert(
        "from".to_string(),
        json!([{ "collectionId": collection.name() }]),
    );

    match query.filters.as_slice() {
        [] => {}
        [single] => {
            structured.insert("where".to_string(), encode_filter(single));
        }
        many => {
            structured.insert(
                "where".to_string(),
                json!({
                    "compositeFilter": {
                        "op": "AND",
                        "filters": many.iter().map(encode_filter).collect::<Vec<_>>(),
                    }
                }),
            );
        }
    }

    if let Some((field, direction)) = &query.order_by {
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured.insert(
            "orderBy".to_string(),
            json!([{ "field": { "fieldPath": field }, "direction": direction }]),
        );
    }

    if let Some(cursor) = &query.start_after {
        // Cursor values follow the orderBy fields, then the implicit __name__.
        structured.insert(
            "startAt".to_string(),
            json!({
                "values": [
                    encode_value(&cursor.value),
                    { "referenceValue": format!("{}/{}", documents_name, cursor.doc) },
                ],
                "before": false,
            }),
        );
    }

    if let Some(limit) = query.limit {
        structured.insert("limit".to_string(), json!(limit));
    }

    json!({ "structuredQuery": structured })
}
