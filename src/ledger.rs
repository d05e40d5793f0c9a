//! Inventory ledger: per-event capacity and live availability.
//!
//! Availability is never stored. It is recomputed from the committed order
//! rows on every read, so a commit by one request is visible to the next
//! availability check of any other request.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ReservationError;
use crate::models::{EventId, EventSummary, OrderId};
use crate::store::OrderStore;

pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// Ledger view of one event as of the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub capacity: i64,
    pub sold: i64,
    /// `capacity - sold`. Negative only if capacity was lowered below what
    /// is already sold; treat as zero remaining.
    pub available: i64,
    pub scheduled_date: NaiveDateTime,
}

impl Availability {
    pub fn new(capacity: i64, sold: i64, scheduled_date: NaiveDateTime) -> Self {
        Self {
            capacity,
            sold,
            available: capacity - sold,
            scheduled_date,
        }
    }

    pub fn remaining(&self) -> i64 {
        self.available.max(0)
    }

    /// Admission control: would `ticket_count` more tickets still fit.
    pub fn admits(&self, ticket_count: i32) -> bool {
        self.available >= i64::from(ticket_count)
    }
}

// Для формы заказа: у неизвестного события 0 билетов и нет даты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventDetails {
    pub available_tickets: i64,
    pub event_date: Option<NaiveDateTime>,
}

impl From<Option<Availability>> for EventDetails {
    fn from(availability: Option<Availability>) -> Self {
        match availability {
            Some(a) => EventDetails {
                available_tickets: a.remaining(),
                event_date: Some(a.scheduled_date),
            },
            None => EventDetails {
                available_tickets: 0,
                event_date: None,
            },
        }
    }
}

/// Read-only projection over the order store.
pub struct InventoryLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for InventoryLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: OrderStore> InventoryLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Capacity, sold and available tickets of `event_id`.
    ///
    /// `exclude` leaves one order out of the sold count, which is how an
    /// edit is checked against everything except its own prior reservation.
    pub async fn get_availability(
        &self,
        event_id: EventId,
        exclude: Option<OrderId>,
    ) -> Result<Availability, ReservationError> {
        self.store
            .availability(event_id, exclude)
            .await?
            .ok_or(ReservationError::NotFound("event"))
    }

    pub async fn event_details(&self, event_id: EventId) -> Result<EventDetails, ReservationError> {
        let availability = self.store.availability(event_id, None).await?;
        Ok(EventDetails::from(availability))
    }

    /// Events whose name starts with `term`. An empty term matches nothing.
    pub async fn search_events(&self, term: &str) -> Result<Vec<EventSummary>, ReservationError> {
        if term.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.search_events(term, DEFAULT_SEARCH_LIMIT).await?)
    }
}
