#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use std::time::Duration;

use city_events::models::{CustomerId, EventId, NewEvent, OrderRequest};
use city_events::services::{ReservationService, RetryPolicy};
use city_events::store::MemoryStore;

pub fn event_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 12, 20)
        .unwrap()
        .and_hms_opt(19, 0, 0)
        .unwrap()
}

pub fn today() -> NaiveDateTime {
    event_date() - ChronoDuration::days(30)
}

pub fn after_event() -> NaiveDateTime {
    event_date() + ChronoDuration::hours(1)
}

// Generous lock wait so only admission control decides races in tests
pub fn test_policy() -> RetryPolicy {
    RetryPolicy {
        lock_timeout: Duration::from_secs(10),
        max_retries: 3,
        backoff: Duration::from_millis(5),
    }
}

pub struct Fixture {
    pub service: ReservationService<MemoryStore>,
    pub event: EventId,
    pub anna: CustomerId,
    pub boris: CustomerId,
}

impl Fixture {
    pub fn with_capacity(capacity: i32) -> Self {
        let store = MemoryStore::new();
        let event = store.insert_event(new_event("Philharmonic Winter Concert", capacity));
        let anna = store.insert_customer("Anna Petrova", "4510 123456");
        let boris = store.insert_customer("Boris Ivanov", "4511 654321");
        Fixture {
            service: ReservationService::new(store, test_policy()),
            event,
            anna,
            boris,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        self.service.store()
    }

    pub fn request(&self, customer: CustomerId, tickets: i32) -> OrderRequest {
        order(self.event, customer, tickets, today())
    }

    pub fn sold(&self) -> i64 {
        self.store()
            .orders()
            .iter()
            .filter(|o| o.event_id == self.event)
            .map(|o| i64::from(o.ticket_count))
            .sum()
    }
}

pub fn new_event(name: &str, capacity: i32) -> NewEvent {
    NewEvent {
        name: name.to_string(),
        place_id: 1,
        organizer_id: 1,
        event_date: event_date(),
        ticket_price: 25.0,
        ticket_amount: capacity,
    }
}

pub fn order(
    event_id: EventId,
    customer_id: CustomerId,
    ticket_count: i32,
    order_date: NaiveDateTime,
) -> OrderRequest {
    OrderRequest {
        event_id,
        customer_id,
        ticket_count,
        order_date,
    }
}
