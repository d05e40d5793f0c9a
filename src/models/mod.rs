pub mod customer;
pub mod event;
pub mod order;

pub use customer::{Customer, CustomerId};
pub use event::{Event, EventId, EventSummary, NewEvent};
pub use order::{
    OrderId, OrderQuery, OrderRequest, OrderSort, OrderSummary, Page, SortDirection, TicketOrder,
};
