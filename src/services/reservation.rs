//! Единственный писатель заказов. Создание, изменение и отмена выполняются
//! под блокировками затронутых событий; при конкуренции за блокировку
//! попытка повторяется ограниченное число раз.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::ReservationConfig;
use crate::error::{ReservationError, StoreError};
use crate::ledger::{Availability, EventDetails, InventoryLedger};
use crate::models::{
    Event, EventId, EventSummary, OrderId, OrderQuery, OrderRequest, OrderSummary, Page,
    TicketOrder,
};
use crate::store::{InventoryUnit, OrderStore};

const ORDER_AFTER_EVENT: &str = "order after event date";
const INSUFFICIENT_TICKETS: &str = "insufficient tickets";
const INVENTORY_BUSY: &str = "inventory is busy, try again";

/// Bounds on waiting for and retrying an event's critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub lock_timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(2),
            max_retries: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

impl From<&ReservationConfig> for RetryPolicy {
    fn from(config: &ReservationConfig) -> Self {
        Self {
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

pub struct ReservationService<S> {
    store: Arc<S>,
    ledger: InventoryLedger<S>,
    policy: RetryPolicy,
}

impl<S> Clone for ReservationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: self.ledger.clone(),
            policy: self.policy,
        }
    }
}

fn check_order_date(request: &OrderRequest, event: &Event) -> Result<(), ReservationError> {
    if request.order_date > event.event_date {
        debug!(
            event_id = %event.id,
            order_date = %request.order_date,
            event_date = %event.event_date,
            "order dated after the event"
        );
        return Err(ReservationError::InvalidState(ORDER_AFTER_EVENT));
    }
    Ok(())
}

impl<S: OrderStore> ReservationService<S> {
    pub fn new(store: S, policy: RetryPolicy) -> Self {
        let store = Arc::new(store);
        Self {
            ledger: InventoryLedger::new(Arc::clone(&store)),
            store,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Порядок проверок: количество билетов, событие, покупатель, дата заказа,
    /// остаток билетов.
    pub async fn create_order(&self, request: &OrderRequest) -> Result<OrderId, ReservationError> {
        request.validate()?;
        self.with_retry("create_order", || self.try_create(request))
            .await
    }

    async fn try_create(&self, request: &OrderRequest) -> Result<OrderId, ReservationError> {
        let mut unit = self
            .store
            .lock_events(&[request.event_id], self.policy.lock_timeout)
            .await?;

        let event = unit
            .event(request.event_id)
            .await?
            .ok_or(ReservationError::NotFound("event"))?;
        if !unit.customer_exists(request.customer_id).await? {
            return Err(ReservationError::NotFound("customer"));
        }
        check_order_date(request, &event)?;

        let sold = unit.sold(event.id, None).await?;
        let availability =
            Availability::new(i64::from(event.ticket_amount), sold, event.event_date);
        if !availability.admits(request.ticket_count) {
            debug!(
                event_id = %event.id,
                requested = request.ticket_count,
                available = availability.available,
                "not enough tickets left"
            );
            return Err(ReservationError::Conflict(INSUFFICIENT_TICKETS));
        }

        let id = unit.insert_order(request).await?;
        unit.commit().await?;

        info!(
            order_id = %id,
            event_id = %event.id,
            customer_id = %request.customer_id,
            tickets = request.ticket_count,
            remaining = availability.available - i64::from(request.ticket_count),
            "ticket order created"
        );
        Ok(id)
    }

    // Остаток считается без билетов самого заказа; при переносе на другое
    // событие блокируются оба
    pub async fn update_order(
        &self,
        id: OrderId,
        request: &OrderRequest,
    ) -> Result<(), ReservationError> {
        if self.store.find_order(id).await?.is_none() {
            return Err(ReservationError::NotFound("order"));
        }
        request.validate()?;
        self.with_retry("update_order", || self.try_update(id, request))
            .await
    }

    async fn try_update(&self, id: OrderId, request: &OrderRequest) -> Result<(), ReservationError> {
        let current = self
            .store
            .find_order(id)
            .await?
            .ok_or(ReservationError::NotFound("order"))?;

        let mut unit = self
            .store
            .lock_events(&[current.event_id, request.event_id], self.policy.lock_timeout)
            .await?;

        // Заказ мог переехать на событие, которое мы не блокировали
        match unit.order(id).await? {
            None => return Err(ReservationError::NotFound("order")),
            Some(order) if order.event_id != current.event_id => {
                return Err(StoreError::Contention.into());
            }
            Some(_) => {}
        }

        let event = unit
            .event(request.event_id)
            .await?
            .ok_or(ReservationError::NotFound("event"))?;
        if !unit.customer_exists(request.customer_id).await? {
            return Err(ReservationError::NotFound("customer"));
        }
        check_order_date(request, &event)?;

        let sold = unit.sold(event.id, Some(id)).await?;
        let availability =
            Availability::new(i64::from(event.ticket_amount), sold, event.event_date);
        if !availability.admits(request.ticket_count) {
            debug!(
                order_id = %id,
                event_id = %event.id,
                requested = request.ticket_count,
                available = availability.available,
                "not enough tickets left for edit"
            );
            return Err(ReservationError::Conflict(INSUFFICIENT_TICKETS));
        }

        unit.update_order(&request.clone().into_order(id)).await?;
        unit.commit().await?;

        info!(
            order_id = %id,
            from_event = %current.event_id,
            to_event = %event.id,
            tickets = request.ticket_count,
            "ticket order updated"
        );
        Ok(())
    }

    // Отмена несуществующего заказа не ошибка; возвращает, была ли удалена строка
    pub async fn cancel_order(&self, id: OrderId) -> Result<bool, ReservationError> {
        self.with_retry("cancel_order", || self.try_cancel(id)).await
    }

    async fn try_cancel(&self, id: OrderId) -> Result<bool, ReservationError> {
        let Some(current) = self.store.find_order(id).await? else {
            return Ok(false);
        };

        let mut unit = self
            .store
            .lock_events(&[current.event_id], self.policy.lock_timeout)
            .await?;
        match unit.order(id).await? {
            None => return Ok(false),
            Some(order) if order.event_id != current.event_id => {
                return Err(StoreError::Contention.into());
            }
            Some(_) => {}
        }

        unit.delete_order(id).await?;
        unit.commit().await?;

        info!(
            order_id = %id,
            event_id = %current.event_id,
            tickets = current.ticket_count,
            "ticket order cancelled"
        );
        Ok(true)
    }

    // Остаток для отображения, не бывает отрицательным
    pub async fn query_available_tickets(&self, event_id: EventId) -> Result<i64, ReservationError> {
        Ok(self.ledger.get_availability(event_id, None).await?.remaining())
    }

    pub async fn get_availability(
        &self,
        event_id: EventId,
        exclude: Option<OrderId>,
    ) -> Result<Availability, ReservationError> {
        self.ledger.get_availability(event_id, exclude).await
    }

    pub async fn get_order(&self, id: OrderId) -> Result<TicketOrder, ReservationError> {
        self.store
            .find_order(id)
            .await?
            .ok_or(ReservationError::NotFound("order"))
    }

    pub async fn list_orders(
        &self,
        query: &OrderQuery,
    ) -> Result<Page<OrderSummary>, ReservationError> {
        Ok(self.store.list_orders(query).await?)
    }

    pub async fn event_details(&self, event_id: EventId) -> Result<EventDetails, ReservationError> {
        self.ledger.event_details(event_id).await
    }

    pub async fn search_events(&self, term: &str) -> Result<Vec<EventSummary>, ReservationError> {
        self.ledger.search_events(term).await
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, ReservationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReservationError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.is_contention() => {
                    if retries >= self.policy.max_retries {
                        warn!(operation, retries, "inventory contention persisted, giving up");
                        return Err(ReservationError::Conflict(INVENTORY_BUSY));
                    }
                    retries += 1;
                    warn!(operation, attempt = retries, "inventory contention, retrying");
                    tokio::time::sleep(self.policy.backoff * retries).await;
                }
                Err(ReservationError::Storage(err)) => {
                    tracing::error!(operation, error = %err, "storage failure");
                    return Err(ReservationError::Storage(err));
                }
                other => return other,
            }
        }
    }
}
