use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

use super::{CustomerId, EventId};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed ticket order row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TicketOrder {
    pub id: OrderId,
    pub event_id: EventId,
    pub customer_id: CustomerId,
    pub order_date: NaiveDateTime,
    pub ticket_count: i32,
}

/// Тело запроса на создание и изменение заказа.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OrderRequest {
    pub event_id: EventId,
    pub customer_id: CustomerId,
    #[validate(range(min = 1, message = "ticket count must be at least 1"))]
    pub ticket_count: i32,
    pub order_date: NaiveDateTime,
}

impl OrderRequest {
    pub fn into_order(self, id: OrderId) -> TicketOrder {
        TicketOrder {
            id,
            event_id: self.event_id,
            customer_id: self.customer_id,
            order_date: self.order_date,
            ticket_count: self.ticket_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    #[default]
    OrderDate,
    TicketCount,
}

impl OrderSort {
    pub fn column(self) -> &'static str {
        match self {
            OrderSort::OrderDate => "o.order_date",
            OrderSort::TicketCount => "o.ticket_count",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filters, ordering and paging of the order listing.
///
/// Filters are plain request parameters. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrderQuery {
    pub customer_name: Option<String>,
    pub event_name: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: OrderSort,
    pub direction: SortDirection,
}

impl OrderQuery {
    pub fn customer_filter(&self) -> &str {
        self.customer_name.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn event_filter(&self) -> &str {
        self.event_name.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }
}

// Строка списка заказов с именем покупателя и названием события
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_passport: String,
    pub event_name: String,
    pub order_date: NaiveDateTime,
    pub ticket_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, query: &OrderQuery, total_count: u64) -> Self {
        let page_size = query.page_size();
        Self {
            items,
            page: query.page(),
            page_size,
            total_count,
            total_pages: total_count.div_ceil(u64::from(page_size)),
        }
    }
}
