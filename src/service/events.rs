use serde_json::Value as Json;
use tracing::{debug, warn};

use super::RaceService;
use crate::error::ServiceError;
use crate::store::path::{self, EVENT_CONTENT};
use crate::store::{Cursor, Direction, DocumentStore, Query};

/// Events per page when `size` is not given.
pub const DEFAULT_EVENTS_PAGE_SIZE: usize = 50;

/// Largest accepted page size; bigger requests are clamped.
pub const MAX_EVENTS_PAGE_SIZE: usize = 100;

/// Where a page of the events listing starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventsPage {
    /// After the event with this id.
    After(String),
    /// 1-based page number.
    Number(usize),
}

impl Default for EventsPage {
    fn default() -> Self {
        EventsPage::Number(1)
    }
}

impl<S: DocumentStore> RaceService<S> {
    /// One page of events, newest `createdAt` first.
    ///
    /// An `After` cursor naming an unknown event is ignored and the listing
    /// starts from the top. Page numbers past the end give an empty page.
    pub async fn list_events(&self, size: usize, page: &EventsPage) -> Result<Vec<Json>, ServiceError> {
        let size = size.clamp(1, MAX_EVENTS_PAGE_SIZE);
        let events = path::events()?;
        let ordered = Query::new().order_by("createdAt", Direction::Descending);

        let cursor = match page {
            EventsPage::After(event_id) => self.event_cursor(event_id).await?,
            EventsPage::Number(number) if *number > 1 => {
                let skipped = self
                    .store
                    .query(&events, &ordered.clone().limit((number - 1).saturating_mul(size)))
                    .await?;
                match skipped.last() {
                    Some(last) => self.event_cursor(&last.id).await?,
                    None => return Ok(Vec::new()),
                }
            }
            EventsPage::Number(_) => None,
        };

        let mut query = ordered.limit(size);
        if let Some(cursor) = cursor {
            query = query.start_after(cursor);
        }
        let docs = self.store.query(&events, &query).await?;
        debug!(count = docs.len(), "Listed events");
        Ok(docs.iter().map(|doc| doc.to_json()).collect())
    }

    async fn event_cursor(&self, event_id: &str) -> Result<Option<Cursor>, ServiceError> {
        let event_path = path::event(event_id)?;
        let Some(event) = self.store.get(&event_path).await? else {
            warn!(event_id = event_id, "Events cursor names an unknown event");
            return Ok(None);
        };
        Ok(event.get("createdAt").cloned().map(|value| Cursor {
            value,
            doc: event_path,
        }))
    }

    /// Public content of an event: the first `event_content` document.
    pub async fn event_detail(&self, event_id: &str) -> Result<Json, ServiceError> {
        let content = self
            .store
            .query(
                &path::event_collection(event_id, EVENT_CONTENT)?,
                &Query::new().limit(1),
            )
            .await?;
        content
            .first()
            .map(|doc| doc.to_json())
            .ok_or_else(|| ServiceError::not_found(format!("content for event {}", event_id)))
    }
}
