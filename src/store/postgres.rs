//! Postgres order store.
//!
//! A unit is a database transaction that starts by taking `FOR UPDATE` row
//! locks on the involved `events` rows, in id order, under a transaction
//! local `lock_timeout`. Every writer of an event's orders goes through
//! that row lock, so "read sold, then write" is atomic per event while
//! unrelated events proceed in parallel.

use std::time::Duration;

use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::{InventoryUnit, OrderStore};
use crate::error::StoreError;
use crate::ledger::Availability;
use crate::models::{
    CustomerId, Event, EventId, EventSummary, OrderId, OrderQuery, OrderRequest, OrderSummary,
    Page, TicketOrder,
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LISTING_FILTER: &str = r#"
    FROM ticket_orders o
    JOIN customers c ON c.id = o.customer_id
    JOIN events e ON e.id = o.event_id
    WHERE ($1 = '' OR strpos(lower(c.full_name), lower($1)) > 0)
      AND ($2 = '' OR strpos(lower(e.name), lower($2)) > 0)
"#;

impl OrderStore for PgStore {
    type Unit = PgUnit;

    async fn lock_events(&self, events: &[EventId], timeout: Duration) -> Result<PgUnit, StoreError> {
        let mut ids: Vec<i64> = events.iter().map(|e| e.0).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", timeout.as_millis().max(1)))
            .execute(&mut *tx)
            .await?;

        let locked: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM events WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        debug!(?locked, "event rows locked");

        Ok(PgUnit { tx })
    }

    async fn availability(
        &self,
        event_id: EventId,
        exclude: Option<OrderId>,
    ) -> Result<Option<Availability>, StoreError> {
        let row: Option<(i64, i64, NaiveDateTime)> = sqlx::query_as(
            r#"
            SELECT
                e.ticket_amount::BIGINT,
                COALESCE((
                    SELECT SUM(o.ticket_count)
                    FROM ticket_orders o
                    WHERE o.event_id = e.id
                      AND ($2::BIGINT IS NULL OR o.id <> $2)
                ), 0)::BIGINT,
                e.event_date
            FROM events e
            WHERE e.id = $1
            "#,
        )
        .bind(event_id)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(capacity, sold, date)| Availability::new(capacity, sold, date)))
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<TicketOrder>, StoreError> {
        let order = sqlx::query_as::<_, TicketOrder>(
            "SELECT id, event_id, customer_id, order_date, ticket_count
             FROM ticket_orders
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn search_events(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<EventSummary>, StoreError> {
        let events = sqlx::query_as::<_, EventSummary>(
            "SELECT id, name
             FROM events
             WHERE starts_with(name, $1)
             ORDER BY name, id
             LIMIT $2",
        )
        .bind(prefix)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<OrderSummary>, StoreError> {
        let customer = query.customer_filter();
        let event = query.event_filter();

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {LISTING_FILTER}"))
            .bind(customer)
            .bind(event)
            .fetch_one(&self.pool)
            .await?;

        // Колонка и направление сортировки берутся только из enum
        let direction = query.direction.keyword();
        let sql = format!(
            "SELECT o.id, c.full_name AS customer_name, c.passport_data AS customer_passport,
                    e.name AS event_name, o.order_date, o.ticket_count
             {LISTING_FILTER}
             ORDER BY {} {direction}, o.id {direction}
             LIMIT $3 OFFSET $4",
            query.sort.column(),
        );
        let items = sqlx::query_as::<_, OrderSummary>(&sql)
            .bind(customer)
            .bind(event)
            .bind(i64::from(query.page_size()))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, query, u64::try_from(total).unwrap_or(0)))
    }
}

pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

impl InventoryUnit for PgUnit {
    async fn event(&mut self, id: EventId) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, name, place_id, organizer_id, event_date, ticket_price, ticket_amount
             FROM events
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn customer_exists(&mut self, id: CustomerId) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<TicketOrder>, StoreError> {
        let order = sqlx::query_as::<_, TicketOrder>(
            "SELECT id, event_id, customer_id, order_date, ticket_count
             FROM ticket_orders
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn sold(&mut self, event_id: EventId, exclude: Option<OrderId>) -> Result<i64, StoreError> {
        let sold = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(ticket_count), 0)::BIGINT
             FROM ticket_orders
             WHERE event_id = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
        )
        .bind(event_id)
        .bind(exclude)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(sold)
    }

    async fn insert_order(&mut self, request: &OrderRequest) -> Result<OrderId, StoreError> {
        let id = sqlx::query_scalar::<_, OrderId>(
            "INSERT INTO ticket_orders (event_id, customer_id, order_date, ticket_count)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(request.event_id)
        .bind(request.customer_id)
        .bind(request.order_date)
        .bind(request.ticket_count)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn update_order(&mut self, order: &TicketOrder) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE ticket_orders
             SET event_id = $2, customer_id = $3, order_date = $4, ticket_count = $5
             WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.event_id)
        .bind(order.customer_id)
        .bind(order.order_date)
        .bind(order.ticket_count)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM ticket_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
