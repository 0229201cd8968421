use serde_json::Value as Json;
use tracing::{debug, info, warn};

use super::RaceService;
use crate::error::ServiceError;
use crate::model::{
    CompetitionEntry, Competitor, CompetitorRoute, CompetitorUserCreated, CompetitorUserInput,
    CompetitorUserTarget, ParticipantInput, RouteCompetitor, RouteSummary,
};
use crate::store::path::{
    self, DAY_OF_RACES, EVENT_CATEGORIES, EVENT_PARTICIPANTS, EVENT_ROUTES,
    USER_EMERGENCY_CONTACTS, USER_HEALTH_DATA, USER_MEMBERSHIP, USER_PERSONAL_DATA,
    USER_VEHICLES,
};
use crate::store::value::now;
use crate::store::{
    new_document_id, Direction, Document, DocumentStore, Filter, Query, Value, Write,
};

/// Routes fetched per day before filtering by category.
const ROUTE_CANDIDATES: usize = 50;

impl<S: DocumentStore> RaceService<S> {
    /// Resolve the route a competitor rides on a given day.
    ///
    /// The chain is participant, day, category, route. Each step must
    /// succeed before the next one runs:
    ///
    /// 1. participant exists and `isAvailable`
    /// 2. day of race exists and `isActivate`
    /// 3. first event category named after the registration category
    /// 4. a route for that day whose `categoryIds` include the category
    pub async fn competitor_route(
        &self,
        event_id: &str,
        day_id: &str,
        competitor_id: &str,
    ) -> Result<CompetitorRoute, ServiceError> {
        let participant = self
            .require(
                &path::event_collection(event_id, EVENT_PARTICIPANTS)?.doc(competitor_id)?,
                "participant",
            )
            .await?;
        if !participant.flag("isAvailable") {
            return Err(ServiceError::not_found(format!(
                "available participant {}",
                competitor_id
            )));
        }

        let day = self
            .require(
                &path::event_collection(event_id, DAY_OF_RACES)?.doc(day_id)?,
                "day of race",
            )
            .await?;
        if !day.flag("isActivate") {
            return Err(ServiceError::not_found(format!("active day of race {}", day_id)));
        }

        let registration = participant
            .str("competitionCategory.registrationCategory")
            .map(str::trim)
            .unwrap_or_default();
        if registration.is_empty() {
            return Err(ServiceError::not_found("registration category"));
        }

        let categories = self
            .store
            .query(
                &path::event_collection(event_id, EVENT_CATEGORIES)?,
                &Query::new().filter(Filter::eq("name", registration)).limit(1),
            )
            .await?;
        let category = categories
            .first()
            .ok_or_else(|| ServiceError::not_found(format!("category {}", registration)))?;
        debug!(category_id = %category.id, "Resolved competitor category");

        let routes = self
            .store
            .query(
                &path::event_collection(event_id, EVENT_ROUTES)?,
                &Query::new()
                    .filter(Filter::array_contains("dayOfRaceIds", day_id))
                    .limit(ROUTE_CANDIDATES),
            )
            .await?;
        let category_id = Value::from(category.id.as_str());
        let route = routes
            .iter()
            .find(|route| {
                route
                    .get("categoryIds")
                    .is_some_and(|ids| ids.contains(&category_id))
            })
            .ok_or_else(|| {
                ServiceError::not_found(format!("route for day {} and category {}", day_id, category.id))
            })?;

        Ok(CompetitorRoute {
            competitor: RouteCompetitor::from_participant(&participant),
            route: RouteSummary::from(route),
        })
    }

    /// One participant of an event.
    pub async fn competitor_by_id(
        &self,
        event_id: &str,
        competitor_id: &str,
    ) -> Result<Competitor, ServiceError> {
        let doc = self
            .require(
                &path::event_collection(event_id, EVENT_PARTICIPANTS)?.doc(competitor_id)?,
                "competitor",
            )
            .await?;
        Ok(Competitor::from_participant(&doc, event_id))
    }

    /// Participants of an event, newest registration first.
    pub async fn competitors_by_event(
        &self,
        event_id: &str,
        category: Option<&str>,
        team: Option<&str>,
    ) -> Result<Vec<Competitor>, ServiceError> {
        let mut query = Query::new().order_by("registrationDate", Direction::Descending);
        if let Some(category) = category {
            query = query.filter(Filter::eq("competitionCategory.registrationCategory", category));
        }
        if let Some(team) = team {
            query = query.filter(Filter::eq("team", team));
        }

        let docs = self
            .store
            .query(&path::event_collection(event_id, EVENT_PARTICIPANTS)?, &query)
            .await?;
        Ok(docs
            .iter()
            .map(|doc| Competitor::from_participant(doc, event_id))
            .collect())
    }

    /// Register an existing user as a participant of an event and return
    /// the participant id, which is the user id.
    ///
    /// The user and the event must exist (404). A user already registered
    /// in the event, or a pilot number already taken there, is a conflict.
    pub async fn create_competitor(&self, body: &Json) -> Result<String, ServiceError> {
        let input = ParticipantInput::from_json(body)?;
        let event_id = &input.competition.event_id;

        self.require(&path::user(&input.user_id)?, "user").await?;
        self.require(&path::event(event_id)?, "event").await?;

        let participant =
            path::event_collection(event_id, EVENT_PARTICIPANTS)?.doc(&input.user_id)?;
        if self.store.get(&participant).await?.is_some() {
            warn!(user_id = %input.user_id, event_id = %event_id, "Participant already registered");
            return Err(ServiceError::conflict(format!("participant {}", participant)));
        }
        self.check_pilot_number(&input.competition).await?;

        let timestamp = now();
        let fields = input.competition.participant_fields(
            &input.user_id,
            input.registration_date.unwrap_or(timestamp),
            timestamp,
        );
        self.store
            .commit(vec![Write::Create {
                path: participant,
                fields,
            }])
            .await?;

        info!(user_id = %input.user_id, event_id = %event_id, "Participant created");
        Ok(input.user_id)
    }

    /// Create a competitor account and register it in an event.
    ///
    /// Email and username must be unused, the event must exist and the
    /// pilot number must be free in it. The user document, its profile
    /// subcollections, the membership and the participant are written in a
    /// single commit.
    pub async fn create_competitor_user(
        &self,
        body: &Json,
    ) -> Result<CompetitorUserCreated, ServiceError> {
        let input = CompetitorUserInput::from_json(body)?;
        let event_id = input.competition.event_id.clone();

        for (field, value) in [("email", &input.email), ("username", &input.username)] {
            if self.find_user(field, value).await?.is_some() {
                warn!(field = field, "Competitor account already exists");
                return Err(ServiceError::conflict(format!("user with {} {}", field, value)));
            }
        }
        self.require(&path::event(&event_id)?, "event").await?;
        self.check_pilot_number(&input.competition).await?;

        let user_id = new_document_id();
        let timestamp = now();
        let created = |collection: &str, fields| -> Result<Write, ServiceError> {
            Ok(Write::Create {
                path: path::user_collection(&user_id, collection)?.doc(&new_document_id())?,
                fields,
            })
        };

        let mut writes = vec![
            Write::Create {
                path: path::user(&user_id)?,
                fields: input.user_fields(timestamp),
            },
            created(USER_PERSONAL_DATA, input.personal_data_fields(timestamp))?,
            created(USER_HEALTH_DATA, input.health_data_fields(timestamp))?,
        ];
        for contact in input.emergency_contact_fields(timestamp) {
            writes.push(created(USER_EMERGENCY_CONTACTS, contact)?);
        }
        if let Some(vehicle) = input.vehicle_fields(timestamp) {
            writes.push(created(USER_VEHICLES, vehicle)?);
        }
        writes.push(Write::Create {
            path: path::user_collection(&user_id, USER_MEMBERSHIP)?.doc(&event_id)?,
            fields: input.membership_fields(&user_id, timestamp),
        });
        writes.push(Write::Create {
            path: path::event_collection(&event_id, EVENT_PARTICIPANTS)?.doc(&user_id)?,
            fields: input
                .competition
                .participant_fields(&user_id, timestamp, timestamp),
        });

        let count = writes.len();
        self.store.commit(writes).await?;
        info!(
            user_id = %user_id,
            event_id = %event_id,
            documents = count,
            "Competitor account created"
        );

        Ok(CompetitorUserCreated {
            id: user_id,
            membership_id: event_id,
        })
    }

    /// Remove a competitor account: the event participant, the membership,
    /// every profile subcollection document and the user document, in one
    /// commit.
    ///
    /// The user is found by id, or by email when no id is given.
    pub async fn delete_competitor_user(&self, body: &Json) -> Result<(), ServiceError> {
        let target = CompetitorUserTarget::from_json(body)?;

        let user_id = match (&target.user_id, &target.email) {
            (Some(user_id), _) => user_id.clone(),
            (None, Some(email)) => self
                .find_user("email", email)
                .await?
                .map(|user| user.id)
                .ok_or_else(|| ServiceError::not_found(format!("user with email {}", email)))?,
            (None, None) => return Err(ServiceError::bad_request("userId or email is required")),
        };
        let user = path::user(&user_id)?;
        self.require(&user, "user").await?;

        let mut writes = vec![
            Write::Delete {
                path: path::event_collection(&target.event_id, EVENT_PARTICIPANTS)?
                    .doc(&user_id)?,
            },
            Write::Delete {
                path: path::user_collection(&user_id, USER_MEMBERSHIP)?.doc(&target.event_id)?,
            },
        ];
        for collection in [
            USER_VEHICLES,
            USER_EMERGENCY_CONTACTS,
            USER_HEALTH_DATA,
            USER_PERSONAL_DATA,
        ] {
            let collection = path::user_collection(&user_id, collection)?;
            for doc in self.store.list(&collection).await? {
                writes.push(Write::Delete {
                    path: collection.doc(&doc.id)?,
                });
            }
        }
        writes.push(Write::Delete { path: user });

        let count = writes.len();
        self.store.commit(writes).await?;
        info!(
            user_id = %user_id,
            event_id = %target.event_id,
            documents = count,
            "Competitor account deleted"
        );
        Ok(())
    }

    async fn find_user(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, ServiceError> {
        let users = self
            .store
            .query(
                &path::users()?,
                &Query::new().filter(Filter::eq(field, value)).limit(1),
            )
            .await?;
        Ok(users.into_iter().next())
    }

    /// A non-blank pilot number must not be taken in the event.
    async fn check_pilot_number(&self, entry: &CompetitionEntry) -> Result<(), ServiceError> {
        let Some(pilot_number) = entry.pilot_number() else {
            return Ok(());
        };
        let taken = self
            .store
            .query(
                &path::event_collection(&entry.event_id, EVENT_PARTICIPANTS)?,
                &Query::new()
                    .filter(Filter::eq("competitionCategory.pilotNumber", pilot_number.clone()))
                    .limit(1),
            )
            .await?;
        if !taken.is_empty() {
            warn!(event_id = %entry.event_id, "Pilot number already taken");
            return Err(ServiceError::conflict(format!(
                "pilot number {} in event {}",
                pilot_number.to_display_string(),
                entry.event_id
            )));
        }
        Ok(())
    }
}
