//! In-process order store.
//!
//! Tables live behind one short-lived `std::sync::Mutex` that is never held
//! across an await. Admission control is serialized by [`EventLocks`]; a
//! unit stages its writes and applies them under a single table lock on
//! commit.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use super::locks::EventLocks;
use super::{InventoryUnit, OrderStore};
use crate::error::StoreError;
use crate::ledger::Availability;
use crate::models::{
    Customer, CustomerId, Event, EventId, EventSummary, NewEvent, OrderId, OrderQuery,
    OrderRequest, OrderSort, OrderSummary, Page, SortDirection, TicketOrder,
};

#[derive(Debug, Default)]
struct Tables {
    events: BTreeMap<EventId, Event>,
    customers: BTreeMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, TicketOrder>,
}

impl Tables {
    fn sold(&self, event_id: EventId, exclude: Option<OrderId>) -> i64 {
        self.orders
            .values()
            .filter(|o| o.event_id == event_id && Some(o.id) != exclude)
            .map(|o| i64::from(o.ticket_count))
            .sum()
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    locks: EventLocks,
    next_id: AtomicI64,
}

impl Shared {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Административные методы вместо CRUD-слоя событий и покупателей

    pub fn insert_event(&self, event: NewEvent) -> EventId {
        let id = EventId(self.shared.next_id());
        let row = Event {
            id,
            name: event.name,
            place_id: event.place_id,
            organizer_id: event.organizer_id,
            event_date: event.event_date,
            ticket_price: event.ticket_price,
            ticket_amount: event.ticket_amount,
        };
        self.shared.tables().events.insert(id, row);
        id
    }

    pub fn insert_customer(&self, full_name: &str, passport_data: &str) -> CustomerId {
        let id = CustomerId(self.shared.next_id());
        let row = Customer {
            id,
            full_name: full_name.to_string(),
            passport_data: passport_data.to_string(),
        };
        self.shared.tables().customers.insert(id, row);
        id
    }

    /// Changes an event's capacity. Returns `false` for an unknown event.
    pub fn set_capacity(&self, event_id: EventId, ticket_amount: i32) -> bool {
        match self.shared.tables().events.get_mut(&event_id) {
            Some(event) => {
                event.ticket_amount = ticket_amount;
                true
            }
            None => false,
        }
    }

    pub fn orders(&self) -> Vec<TicketOrder> {
        self.shared.tables().orders.values().cloned().collect()
    }
}

impl OrderStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn lock_events(
        &self,
        events: &[EventId],
        timeout: Duration,
    ) -> Result<MemoryUnit, StoreError> {
        // Несуществующие события не блокируем, как и FOR UPDATE в Postgres
        let locked: Vec<EventId> = {
            let tables = self.shared.tables();
            events
                .iter()
                .copied()
                .filter(|id| tables.events.contains_key(id))
                .collect()
        };
        let guards = self.shared.locks.acquire(&locked, timeout).await?;
        Ok(MemoryUnit {
            shared: Arc::clone(&self.shared),
            locked,
            staged: Vec::new(),
            _guards: guards,
        })
    }

    async fn availability(
        &self,
        event_id: EventId,
        exclude: Option<OrderId>,
    ) -> Result<Option<Availability>, StoreError> {
        let tables = self.shared.tables();
        Ok(tables.events.get(&event_id).map(|event| {
            Availability::new(
                i64::from(event.ticket_amount),
                tables.sold(event_id, exclude),
                event.event_date,
            )
        }))
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<TicketOrder>, StoreError> {
        Ok(self.shared.tables().orders.get(&id).cloned())
    }

    async fn search_events(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<EventSummary>, StoreError> {
        let tables = self.shared.tables();
        let mut found: Vec<EventSummary> = tables
            .events
            .values()
            .filter(|e| e.name.starts_with(prefix))
            .map(|e| EventSummary {
                id: e.id,
                name: e.name.clone(),
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        found.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(found)
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<OrderSummary>, StoreError> {
        let customer_filter = query.customer_filter().to_lowercase();
        let event_filter = query.event_filter().to_lowercase();

        let tables = self.shared.tables();
        let mut rows: Vec<OrderSummary> = tables
            .orders
            .values()
            .filter_map(|order| {
                let customer = tables.customers.get(&order.customer_id)?;
                let event = tables.events.get(&order.event_id)?;
                Some(OrderSummary {
                    id: order.id,
                    customer_name: customer.full_name.clone(),
                    customer_passport: customer.passport_data.clone(),
                    event_name: event.name.clone(),
                    order_date: order.order_date,
                    ticket_count: order.ticket_count,
                })
            })
            .filter(|row| row.customer_name.to_lowercase().contains(&customer_filter))
            .filter(|row| row.event_name.to_lowercase().contains(&event_filter))
            .collect();
        drop(tables);

        rows.sort_by(|a, b| {
            let by_key = match query.sort {
                OrderSort::OrderDate => a.order_date.cmp(&b.order_date),
                OrderSort::TicketCount => a.ticket_count.cmp(&b.ticket_count),
            };
            let ordering = by_key.then(a.id.cmp(&b.id));
            match query.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = rows.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = rows
            .into_iter()
            .skip(offset)
            .take(query.page_size() as usize)
            .collect();
        Ok(Page::new(items, query, total))
    }
}

#[derive(Debug)]
enum Staged {
    Upsert(TicketOrder),
    Delete(OrderId),
}

/// Unit of work over the in-memory tables.
#[derive(Debug)]
pub struct MemoryUnit {
    shared: Arc<Shared>,
    locked: Vec<EventId>,
    staged: Vec<Staged>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl InventoryUnit for MemoryUnit {
    async fn event(&mut self, id: EventId) -> Result<Option<Event>, StoreError> {
        let event = self.shared.tables().events.get(&id).cloned();
        // Событие появилось после открытия unit и не заблокировано
        if event.is_some() && !self.locked.contains(&id) {
            return Err(StoreError::Contention);
        }
        Ok(event)
    }

    async fn customer_exists(&mut self, id: CustomerId) -> Result<bool, StoreError> {
        Ok(self.shared.tables().customers.contains_key(&id))
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<TicketOrder>, StoreError> {
        Ok(self.shared.tables().orders.get(&id).cloned())
    }

    async fn sold(&mut self, event_id: EventId, exclude: Option<OrderId>) -> Result<i64, StoreError> {
        Ok(self.shared.tables().sold(event_id, exclude))
    }

    async fn insert_order(&mut self, request: &OrderRequest) -> Result<OrderId, StoreError> {
        let id = OrderId(self.shared.next_id());
        self.staged.push(Staged::Upsert(request.clone().into_order(id)));
        Ok(id)
    }

    async fn update_order(&mut self, order: &TicketOrder) -> Result<(), StoreError> {
        self.staged.push(Staged::Upsert(order.clone()));
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<(), StoreError> {
        self.staged.push(Staged::Delete(id));
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let mut tables = self.shared.tables();
        for write in self.staged.drain(..) {
            match write {
                Staged::Upsert(order) => {
                    tables.orders.insert(order.id, order);
                }
                Staged::Delete(id) => {
                    tables.orders.remove(&id);
                }
            }
        }
        Ok(())
    }
}
