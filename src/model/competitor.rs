//! Competitors (event participants) and their resolved route.

use serde::Serialize;
use serde_json::{json, Value as Json};

use crate::store::Document;

/// Response of the competitor-route endpoint: exactly these two keys.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetitorRoute {
    pub competitor: RouteCompetitor,
    pub route: RouteSummary,
}

/// Competitor part of [`CompetitorRoute`].
///
/// `category` carries the pilot number when one is assigned and falls back
/// to the registration category; `nombre` is the registration category.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteCompetitor {
    pub id: String,
    pub category: String,
    pub nombre: String,
}

impl RouteCompetitor {
    pub fn from_participant(doc: &Document) -> Self {
        let registration = doc
            .str("competitionCategory.registrationCategory")
            .unwrap_or_default()
            .to_string();
        let category = doc
            .get("competitionCategory.pilotNumber")
            .filter(|v| !v.is_null())
            .map(|v| v.to_display_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| registration.clone());

        Self {
            id: doc.id.clone(),
            category,
            nombre: registration,
        }
    }
}

/// Route part of [`CompetitorRoute`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: String,
    pub name: Json,
    pub route: Json,
    pub version: i64,
    pub total_distance: Json,
    #[serde(rename = "typedistance")]
    pub type_distance: Json,
}

/// Route format version served to clients.
pub const ROUTE_VERSION: i64 = 1;

impl From<&Document> for RouteSummary {
    fn from(doc: &Document) -> Self {
        let total_distance = match doc.json("totalDistance") {
            Json::Null => json!(0),
            other => other,
        };
        let type_distance = match doc.json("typedistance") {
            Json::Null => doc.json("typeDistance"),
            other => other,
        };

        Self {
            id: doc.id.clone(),
            name: doc.json("name"),
            route: doc.json("routeUrl"),
            version: ROUTE_VERSION,
            total_distance,
            type_distance,
        }
    }
}

/// Competitor registration category block.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionCategory {
    pub pilot_number: Json,
    pub registration_category: Json,
}

/// A competitor as returned by the lookup endpoints.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub id: String,
    pub event_id: String,
    pub competition_category: CompetitionCategory,
    pub registration_date: Json,
    pub team: Json,
    pub score: Json,
    pub times_to_start: Json,
    pub created_at: Json,
    pub updated_at: Json,
}

impl Competitor {
    /// Build from a participant document of event `event_id`.
    pub fn from_participant(doc: &Document, event_id: &str) -> Self {
        let score = match doc.json("score") {
            Json::Null => json!(0),
            other => other,
        };
        let times_to_start = match doc.json("timesToStart") {
            Json::Null => json!([]),
            other => other,
        };

        Self {
            id: doc.id.clone(),
            event_id: doc.str("eventId").unwrap_or(event_id).to_string(),
            competition_category: CompetitionCategory {
                pilot_number: doc.json("competitionCategory.pilotNumber"),
                registration_category: doc.json("competitionCategory.registrationCategory"),
            },
            registration_date: doc.json("registrationDate"),
            team: doc.json("team"),
            score,
            times_to_start,
            created_at: doc.json("createdAt"),
            updated_at: doc.json("updatedAt"),
        }
    }
}
