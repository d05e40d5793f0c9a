use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scheduled event with a fixed ticket capacity.
///
/// `ticket_amount` is the capacity. It may be edited by an administrator at
/// any time and takes effect for the next availability computation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub place_id: i64,
    pub organizer_id: i64,
    pub event_date: NaiveDateTime,
    pub ticket_price: f64,
    pub ticket_amount: i32,
}

// Событие до присвоения id
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub place_id: i64,
    pub organizer_id: i64,
    pub event_date: NaiveDateTime,
    pub ticket_price: f64,
    pub ticket_amount: i32,
}

// Результат поиска событий
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub name: String,
}
