//! Competitor tracking: statuses, checkpoint types, the visibility rule and
//! the tracking views.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value as Json;

use super::{body_object, optional_string, trimmed_string};
use crate::error::ServiceError;
use crate::store::Document;

// =============================================================================
// Status and Checkpoint Type
// =============================================================================

/// Status of a competitor at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompetitorStatus {
    None,
    NoneStart,
    NoneLast,
    Check,
    CheckStart,
    CheckLast,
    Out,
    OutStart,
    OutLast,
}

impl CompetitorStatus {
    pub const ALL: [CompetitorStatus; 9] = [
        CompetitorStatus::None,
        CompetitorStatus::NoneStart,
        CompetitorStatus::NoneLast,
        CompetitorStatus::Check,
        CompetitorStatus::CheckStart,
        CompetitorStatus::CheckLast,
        CompetitorStatus::Out,
        CompetitorStatus::OutStart,
        CompetitorStatus::OutLast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitorStatus::None => "none",
            CompetitorStatus::NoneStart => "noneStart",
            CompetitorStatus::NoneLast => "noneLast",
            CompetitorStatus::Check => "check",
            CompetitorStatus::CheckStart => "checkStart",
            CompetitorStatus::CheckLast => "checkLast",
            CompetitorStatus::Out => "out",
            CompetitorStatus::OutStart => "outStart",
            CompetitorStatus::OutLast => "outLast",
        }
    }

    /// Out statuses disable the competitor from this checkpoint onward.
    pub fn is_out(&self) -> bool {
        matches!(
            self,
            CompetitorStatus::Out | CompetitorStatus::OutStart | CompetitorStatus::OutLast
        )
    }
}

impl FromStr for CompetitorStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompetitorStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ServiceError::bad_request(format!("invalid status: {}", s)))
    }
}

impl fmt::Display for CompetitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of checkpoint along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointType {
    Start,
    Pass,
    Timer,
    StartTimer,
    EndTimer,
    Finish,
}

impl CheckpointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointType::Start => "start",
            CheckpointType::Pass => "pass",
            CheckpointType::Timer => "timer",
            CheckpointType::StartTimer => "startTimer",
            CheckpointType::EndTimer => "endTimer",
            CheckpointType::Finish => "finish",
        }
    }

    /// Parse a stored type, `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        [
            CheckpointType::Start,
            CheckpointType::Pass,
            CheckpointType::Timer,
            CheckpointType::StartTimer,
            CheckpointType::EndTimer,
            CheckpointType::Finish,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
    }
}

/// Default type of a checkpoint without one.
pub const DEFAULT_CHECKPOINT_TYPE: &str = "pass";

/// Default status of a competitor without one.
pub const DEFAULT_STATUS: &str = "none";

/// Whether a competitor with `status` is listed at a checkpoint of
/// `checkpoint_type`.
///
/// - `out`: visible everywhere
/// - `outStart`: visible only at `start` and `finish` checkpoints
/// - anything else: visible
pub fn is_competitor_visible(status: &str, checkpoint_type: &str) -> bool {
    match status {
        "out" => true,
        "outStart" => matches!(
            CheckpointType::parse(checkpoint_type),
            Some(CheckpointType::Start | CheckpointType::Finish)
        ),
        _ => true,
    }
}

// =============================================================================
// Status Mutations
// =============================================================================

/// Body of `PUT /api/change-competitor-status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub event_id: String,
    pub day_of_race_id: String,
    pub checkpoint_id: String,
    pub competitor_id: String,
    pub order_checkpoint: i64,
    pub status: CompetitorStatus,
    pub last_status: CompetitorStatus,
    pub checkpoint_name: String,
    pub note: Option<String>,
}

impl StatusChange {
    pub fn from_json(body: &Json) -> Result<Self, ServiceError> {
        let object = body_object(body)?;

        let order_checkpoint = match object.get("orderCheckpoint") {
            Some(Json::Number(n)) => n.as_i64(),
            Some(Json::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|order| *order >= 0)
        .ok_or_else(|| ServiceError::bad_request("orderCheckpoint must be a non-negative integer"))?;

        Ok(Self {
            event_id: trimmed_string(object, "eventId")?,
            day_of_race_id: trimmed_string(object, "dayOfRaceId")?,
            checkpoint_id: trimmed_string(object, "checkpointId")?,
            competitor_id: trimmed_string(object, "competitorId")?,
            order_checkpoint,
            status: trimmed_string(object, "status")?.parse()?,
            last_status: trimmed_string(object, "lastStatusCompetitor")?.parse()?,
            checkpoint_name: trimmed_string(object, "checkpointName")?,
            note: optional_string(object, "note")?,
        })
    }
}

/// Body of `PUT /api/update-competitor-status/...`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: CompetitorStatus,
    pub checkpoint_disable_name: Option<String>,
    pub note: Option<String>,
}

impl StatusUpdate {
    pub fn from_json(body: &Json) -> Result<Self, ServiceError> {
        let object = body_object(body)?;
        let status: CompetitorStatus = trimmed_string(object, "status")?.parse()?;
        let checkpoint_disable_name = optional_string(object, "checkpointDisableName")?
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        if status.is_out() && checkpoint_disable_name.is_none() {
            return Err(ServiceError::bad_request(
                "checkpointDisableName is required for out statuses",
            ));
        }

        Ok(Self {
            status,
            checkpoint_disable_name,
            note: optional_string(object, "note")?,
        })
    }
}

// =============================================================================
// Views
// =============================================================================

/// One checkpoint of a tracked competitor.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingCheckpointView {
    pub id: String,
    pub name: Json,
    pub order: Json,
    pub checkpoint_type: String,
    pub status_competitor: String,
    pub checkpoint_disable: String,
    pub checkpoint_disable_name: String,
    pub pass_time: Json,
    pub note: Json,
}

/// A competitor as seen from the tracking tree.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedCompetitor {
    pub id: String,
    pub name: Json,
    pub order: Json,
    pub category: Json,
    pub number: String,
    pub time_to_start: Json,
    pub created_at: Json,
    pub updated_at: Json,
    pub tracking_checkpoints: Vec<TrackingCheckpointView>,
}

impl From<&Document> for TrackingCheckpointView {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: json_or(doc, "name", Json::from("")),
            order: json_or(doc, "order", Json::from(0)),
            checkpoint_type: string_or(doc, "checkpointType", DEFAULT_CHECKPOINT_TYPE),
            status_competitor: string_or(doc, "statusCompetitor", DEFAULT_STATUS),
            checkpoint_disable: string_or(doc, "checkpointDisable", ""),
            checkpoint_disable_name: string_or(doc, "checkpointDisableName", ""),
            pass_time: doc.json("passTime"),
            note: doc.json("note"),
        }
    }
}

impl TrackedCompetitor {
    /// Build from a tracking competitor document. The timestamps are left
    /// as stored; callers stamping query time overwrite them.
    pub fn from_tracking(doc: &Document, checkpoints: Vec<TrackingCheckpointView>) -> Self {
        let number = match doc.get("number") {
            Some(value) if !value.is_null() => value.to_display_string(),
            _ => String::new(),
        };

        Self {
            id: doc.id.clone(),
            name: json_or(doc, "name", Json::from("")),
            order: json_or(doc, "order", Json::from(0)),
            category: json_or(doc, "category", Json::from("")),
            number,
            time_to_start: doc.json("timeToStart"),
            created_at: doc.json("createdAt"),
            updated_at: doc.json("updatedAt"),
            tracking_checkpoints: checkpoints,
        }
    }
}

fn json_or(doc: &Document, key: &str, default: Json) -> Json {
    match doc.json(key) {
        Json::Null => default,
        other => other,
    }
}

/// String field, `default` when absent, null or empty.
fn string_or(doc: &Document, key: &str, default: &str) -> String {
    doc.str(key)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Competitors at one checkpoint plus the name of the route through it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorTrackingView {
    pub competitors: Vec<TrackedCompetitor>,
    pub route_name: Option<String>,
}
