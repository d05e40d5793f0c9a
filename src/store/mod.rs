//! Storage seam of the reservation core.
//!
//! An [`OrderStore`] answers unlocked reads and opens [`InventoryUnit`]s.
//! A unit holds the inventory locks of a set of events for its whole
//! lifetime: reads inside it see a stable order set for those events, its
//! writes become visible together on [`InventoryUnit::commit`], and dropping
//! it without committing discards them and releases the locks.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;
use crate::ledger::Availability;
use crate::models::{
    CustomerId, Event, EventId, EventSummary, OrderId, OrderQuery, OrderRequest, OrderSummary,
    Page, TicketOrder,
};

pub mod locks;
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait OrderStore: Send + Sync + 'static {
    type Unit: InventoryUnit;

    /// Opens an atomic unit holding the locks of `events`.
    ///
    /// Locks are taken in ascending id order. Fails with
    /// [`StoreError::Contention`] if they cannot all be taken within
    /// `timeout`.
    fn lock_events(
        &self,
        events: &[EventId],
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Unit, StoreError>> + Send;

    /// Consistent capacity/sold snapshot, `None` for an unknown event.
    fn availability(
        &self,
        event_id: EventId,
        exclude: Option<OrderId>,
    ) -> impl Future<Output = Result<Option<Availability>, StoreError>> + Send;

    fn find_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<TicketOrder>, StoreError>> + Send;

    fn search_events(
        &self,
        prefix: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<EventSummary>, StoreError>> + Send;

    fn list_orders(
        &self,
        query: &OrderQuery,
    ) -> impl Future<Output = Result<Page<OrderSummary>, StoreError>> + Send;
}

pub trait InventoryUnit: Send {
    fn event(
        &mut self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<Event>, StoreError>> + Send;

    fn customer_exists(
        &mut self,
        id: CustomerId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn order(
        &mut self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<TicketOrder>, StoreError>> + Send;

    /// Tickets committed for `event_id`, leaving out `exclude`.
    fn sold(
        &mut self,
        event_id: EventId,
        exclude: Option<OrderId>,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn insert_order(
        &mut self,
        request: &OrderRequest,
    ) -> impl Future<Output = Result<OrderId, StoreError>> + Send;

    fn update_order(
        &mut self,
        order: &TicketOrder,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_order(&mut self, id: OrderId)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
