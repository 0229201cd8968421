//! Competitor registration: event participants and competitor accounts.
//!
//! A competitor account is a user document with its profile split across
//! subcollections (`personalData`, `healthData`, `emergencyContacts`,
//! `vehicles`), a `membership` entry per event, and the participant document
//! keyed by the user id.

use std::ops::RangeInclusive;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use serde_json::{Map, Value as Json};

use super::{body_object, trimmed_string};
use crate::error::ServiceError;
use crate::store::{Fields, Value};

/// Shortest accepted username.
pub const MIN_USERNAME_LEN: usize = 4;

/// Accepted phone length, counted in digits once separators are removed.
const PHONE_DIGITS: RangeInclusive<usize> = 10..=15;

/// Top-level keys a competitor account body must carry.
const ACCOUNT_KEYS: [&str; 5] = [
    "personalData",
    "emergencyContacts",
    "username",
    "email",
    "competition",
];

const PERSONAL_DATA_KEYS: [&str; 7] = [
    "fullName",
    "phone",
    "address",
    "city",
    "state",
    "country",
    "postalCode",
];

const HEALTH_DATA_KEYS: [&str; 6] = [
    "bloodType",
    "allergies",
    "medications",
    "medicalConditions",
    "insuranceProvider",
    "insuranceNumber",
];

// =============================================================================
// Competition Entry
// =============================================================================

/// How a competitor takes part in one event.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionEntry {
    pub event_id: String,
    pub pilot_number: Value,
    pub registration_category: Value,
    pub team: Value,
}

impl CompetitionEntry {
    /// Read the entry object; `team` falls back to the body root.
    fn read(entry: &Map<String, Json>, root: &Map<String, Json>, event_id: String) -> Self {
        let team = entry
            .get("team")
            .filter(|team| is_present(team))
            .or_else(|| root.get("team"));
        Self {
            event_id,
            pilot_number: text_or_empty(entry.get("pilotNumber")),
            registration_category: text_or_empty(entry.get("registrationCategory")),
            team: text_or_empty(team),
        }
    }

    /// Pilot number that must be unique within the event, `None` when blank.
    pub fn pilot_number(&self) -> Option<&Value> {
        is_set(&self.pilot_number).then_some(&self.pilot_number)
    }

    /// Fields of `events/{eventId}/participants/{userId}`.
    pub fn participant_fields(
        &self,
        user_id: &str,
        registration_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    ) -> Fields {
        let mut category = Fields::new();
        category.insert("pilotNumber".into(), self.pilot_number.clone());
        category.insert(
            "registrationCategory".into(),
            self.registration_category.clone(),
        );

        let mut fields = Fields::new();
        fields.insert("userId".into(), user_id.into());
        fields.insert("eventId".into(), self.event_id.as_str().into());
        fields.insert("competitionCategory".into(), Value::Map(category));
        fields.insert("registrationDate".into(), Value::Timestamp(registration_date));
        fields.insert("team".into(), self.team.clone());
        fields.insert("score".into(), Value::Integer(0));
        fields.insert("timesToStart".into(), Value::Array(Vec::new()));
        stamp(&mut fields, timestamp);
        fields
    }
}

// =============================================================================
// Participant
// =============================================================================

/// Validated body of a participant registration for an existing user.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantInput {
    pub user_id: String,
    pub competition: CompetitionEntry,
    pub registration_date: Option<DateTime<Utc>>,
}

impl ParticipantInput {
    /// Validate `{userId, eventId, competition | competitionCategory,
    /// registrationDate?, team?}`.
    ///
    /// `eventId` may also sit inside the competition object.
    /// `registrationDate` must be RFC 3339 when given.
    pub fn from_json(body: &Json) -> Result<Self, ServiceError> {
        let object = body_object(body)?;
        let user_id = trimmed_string(object, "userId")?;

        let empty = Map::new();
        let entry = match object
            .get("competition")
            .filter(|v| !v.is_null())
            .or_else(|| object.get("competitionCategory"))
        {
            None | Some(Json::Null) => &empty,
            Some(Json::Object(entry)) => entry,
            Some(_) => return Err(ServiceError::bad_request("competition must be an object")),
        };
        let event_id = trimmed_string(object, "eventId")
            .or_else(|err| trimmed_string(entry, "eventId").map_err(|_| err))?;

        let registration_date = match object.get("registrationDate") {
            None | Some(Json::Null) => None,
            Some(Json::String(raw)) => Some(parse_date(raw)?),
            Some(_) => {
                return Err(ServiceError::bad_request("registrationDate must be a string"))
            }
        };

        Ok(Self {
            user_id,
            competition: CompetitionEntry::read(entry, object, event_id),
            registration_date,
        })
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|date| date.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|_| ServiceError::bad_request(format!("invalid registrationDate: {}", raw)))
}

// =============================================================================
// Competitor Account
// =============================================================================

/// Validated body of a competitor account creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitorUserInput {
    pub email: String,
    pub username: String,
    pub competition: CompetitionEntry,
    personal_data: Map<String, Json>,
    health_data: Map<String, Json>,
    emergency_contacts: Vec<Map<String, Json>>,
    vehicle_data: Option<Map<String, Json>>,
}

impl CompetitorUserInput {
    /// Validate a competitor account body.
    ///
    /// Required: `personalData` (with `fullName` and `phone`), a non-empty
    /// `emergencyContacts` list (each with `fullName` and `phone`),
    /// `username`, `email` and `competition` (with `eventId`).
    /// `healthData` and `vehicleData` are optional.
    pub fn from_json(body: &Json) -> Result<Self, ServiceError> {
        let object = body_object(body)?;
        for key in ACCOUNT_KEYS {
            if !object.get(key).is_some_and(is_present) {
                return Err(ServiceError::bad_request(format!("{} is required", key)));
            }
        }

        let personal_data = object_field(object, "personalData")?;
        trimmed_string(personal_data, "fullName")?;
        let phone = trimmed_string(personal_data, "phone")?;
        if !is_valid_phone(&phone) {
            return Err(ServiceError::bad_request(format!("invalid phone: {}", phone)));
        }

        let email = trimmed_string(object, "email")?;
        if !is_valid_email(&email) {
            return Err(ServiceError::bad_request(format!("invalid email: {}", email)));
        }

        let username = trimmed_string(object, "username")?;
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(ServiceError::bad_request(format!(
                "username must have at least {} characters",
                MIN_USERNAME_LEN
            )));
        }

        let emergency_contacts = match object.get("emergencyContacts") {
            Some(Json::Array(contacts)) if !contacts.is_empty() => contacts
                .iter()
                .map(|contact| {
                    let contact = contact.as_object().ok_or_else(|| {
                        ServiceError::bad_request("emergency contacts must be objects")
                    })?;
                    trimmed_string(contact, "fullName")?;
                    trimmed_string(contact, "phone")?;
                    Ok(contact.clone())
                })
                .collect::<Result<Vec<_>, ServiceError>>()?,
            _ => {
                return Err(ServiceError::bad_request(
                    "emergencyContacts must be a non-empty list",
                ))
            }
        };

        let competition = object_field(object, "competition")?;
        let event_id = trimmed_string(competition, "eventId")?;

        let health_data = match object.get("healthData") {
            None | Some(Json::Null) => Map::new(),
            Some(Json::Object(health)) => health.clone(),
            Some(_) => return Err(ServiceError::bad_request("healthData must be an object")),
        };

        Ok(Self {
            email,
            username,
            competition: CompetitionEntry::read(competition, object, event_id),
            personal_data: personal_data.clone(),
            health_data,
            emergency_contacts,
            vehicle_data: object.get("vehicleData").and_then(Json::as_object).cloned(),
        })
    }

    /// Fields of the `users/{userId}` document. The account starts inactive
    /// and without an auth identity.
    pub fn user_fields(&self, timestamp: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        fields.insert("email".into(), self.email.as_str().into());
        fields.insert("username".into(), self.username.as_str().into());
        fields.insert("authUserId".into(), Value::Null);
        fields.insert("avatarUrl".into(), Value::Null);
        fields.insert("isActive".into(), false.into());
        stamp(&mut fields, timestamp);
        fields
    }

    pub fn personal_data_fields(&self, timestamp: DateTime<Utc>) -> Fields {
        let mut fields = copy_text(&self.personal_data, &PERSONAL_DATA_KEYS);
        fields.insert(
            "dateOfBirth".into(),
            value_or_null(self.personal_data.get("dateOfBirth")),
        );
        stamp(&mut fields, timestamp);
        fields
    }

    pub fn health_data_fields(&self, timestamp: DateTime<Utc>) -> Fields {
        let mut fields = copy_text(&self.health_data, &HEALTH_DATA_KEYS);
        stamp(&mut fields, timestamp);
        fields
    }

    /// One document per emergency contact, in request order.
    pub fn emergency_contact_fields(&self, timestamp: DateTime<Utc>) -> Vec<Fields> {
        self.emergency_contacts
            .iter()
            .map(|contact| {
                let mut fields = copy_text(contact, &["fullName", "relationship", "phone"]);
                stamp(&mut fields, timestamp);
                fields
            })
            .collect()
    }

    /// The garage entry, when the body carries `vehicleData`. `brand` is
    /// accepted for `branch`.
    pub fn vehicle_fields(&self, timestamp: DateTime<Utc>) -> Option<Fields> {
        let vehicle = self.vehicle_data.as_ref()?;
        let branch = vehicle
            .get("branch")
            .filter(|branch| is_present(branch))
            .or_else(|| vehicle.get("brand"));

        let mut fields = copy_text(vehicle, &["model", "color"]);
        fields.insert("branch".into(), text_or_empty(branch));
        fields.insert("year".into(), value_or_null(vehicle.get("year")));
        stamp(&mut fields, timestamp);
        Some(fields)
    }

    /// Fields of `users/{userId}/membership/{eventId}`.
    pub fn membership_fields(&self, user_id: &str, timestamp: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        fields.insert("userId".into(), user_id.into());
        fields.insert("eventId".into(), self.competition.event_id.as_str().into());
        stamp(&mut fields, timestamp);
        fields
    }
}

/// Response of a competitor account creation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorUserCreated {
    pub id: String,
    pub membership_id: String,
}

// =============================================================================
// Account Removal
// =============================================================================

/// Which competitor account to remove, and from which event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorUserTarget {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub event_id: String,
}

impl CompetitorUserTarget {
    /// Validate `{userId | user_id | email, eventId | event_id}`. The user id
    /// wins over the email when both are given.
    pub fn from_json(body: &Json) -> Result<Self, ServiceError> {
        let object = body_object(body)?;
        let event_id = first_string(object, &["eventId", "event_id"])
            .ok_or_else(|| ServiceError::bad_request("eventId is required"))?;
        let user_id = first_string(object, &["userId", "user_id"]);
        let email = first_string(object, &["email"]);
        if user_id.is_none() && email.is_none() {
            return Err(ServiceError::bad_request("userId or email is required"));
        }
        Ok(Self {
            user_id,
            email,
            event_id,
        })
    }
}

// =============================================================================
// Validation Helpers
// =============================================================================

/// `local@host.tld`: local part of letters, digits and `._%+-`; host of
/// letters, digits, dots and hyphens; an alphabetic TLD of two or more.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
        && !host.is_empty()
        && host.chars().all(|c| c.is_ascii_alphanumeric() || ".-".contains(c))
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// 10 to 15 digits with an optional leading `+`. Whitespace, parentheses and
/// hyphens are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && !"()-".contains(*c))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    PHONE_DIGITS.contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn object_field<'a>(
    object: &'a Map<String, Json>,
    key: &str,
) -> Result<&'a Map<String, Json>, ServiceError> {
    object
        .get(key)
        .and_then(Json::as_object)
        .ok_or_else(|| ServiceError::bad_request(format!("{} must be an object", key)))
}

/// Non-null and, for strings, not blank.
fn is_present(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn first_string(object: &Map<String, Json>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Json::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Stored value of an optional text field; missing or null becomes `""`.
fn text_or_empty(value: Option<&Json>) -> Value {
    match value {
        None | Some(Json::Null) => Value::String(String::new()),
        Some(value) => Value::from_json(value),
    }
}

fn value_or_null(value: Option<&Json>) -> Value {
    value.map(Value::from_json).unwrap_or(Value::Null)
}

fn copy_text(object: &Map<String, Json>, keys: &[&str]) -> Fields {
    keys.iter()
        .map(|key| (key.to_string(), text_or_empty(object.get(*key))))
        .collect()
}

fn stamp(fields: &mut Fields, timestamp: DateTime<Utc>) {
    fields.insert("createdAt".into(), Value::Timestamp(timestamp));
    fields.insert("updatedAt".into(), Value::Timestamp(timestamp));
}
