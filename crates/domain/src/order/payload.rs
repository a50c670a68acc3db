//! Request and response shapes of the order endpoints.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::{OrderStatus, PaymentStatus};
use record_store::{
    OrderDetails, OrderItemDetails, OrderItemRecord, OrderPatch, OrderQuery, OrderRecord,
    OrderWithItems,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderError;

pub(crate) const ORDER_CREATED: &str = "Order created successfully";

/// Default page size of order listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Checkout payload of `POST /orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: Option<String>,
    pub subtotal: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub service_fee: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub pickup_time_estimate: Option<String>,
    pub special_instructions: Option<String>,
    pub items: Option<Vec<OrderItemRequest>>,
}

/// One line of the checkout payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Option<Decimal>,
    pub selected_size: Option<String>,
    pub cooking_point: Option<String>,
    pub special_instructions: Option<String>,
}

impl From<OrderItemRequest> for OrderItemDetails {
    fn from(item: OrderItemRequest) -> Self {
        OrderItemDetails {
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
            selected_size: item.selected_size,
            cooking_point: item.cooking_point,
            special_instructions: item.special_instructions,
        }
    }
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateOrderRequest {
    /// Validates contact fields and splits the payload into header and items.
    pub fn into_parts(self) -> Result<(OrderDetails, Vec<OrderItemDetails>), OrderError> {
        let (Some(customer_email), Some(customer_phone)) =
            (required(self.customer_email), required(self.customer_phone))
        else {
            return Err(OrderError::MissingContact);
        };

        let details = OrderDetails {
            customer_name: self.customer_name,
            customer_email,
            customer_phone,
            payment_method: self.payment_method,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            service_fee: self.service_fee,
            total_amount: self.total_amount.unwrap_or_default(),
            pickup_time_estimate: self.pickup_time_estimate,
            special_instructions: self.special_instructions,
        };
        let items = self
            .items
            .unwrap_or_default()
            .into_iter()
            .map(OrderItemDetails::from)
            .collect();

        Ok((details, items))
    }
}

/// Response of a successful order creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedOrder {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
    pub message: &'static str,
}

impl From<OrderWithItems> for CreatedOrder {
    fn from(created: OrderWithItems) -> Self {
        Self {
            order: created.order,
            items: created.items,
            message: ORDER_CREATED,
        }
    }
}

/// Payload of `PUT /orders/{id}/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "paymentStatus")]
    pub payment_status: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl StatusUpdateRequest {
    /// Parses the supplied fields into a patch. Empty strings count as absent.
    pub fn into_patch(self) -> Result<OrderPatch, OrderError> {
        let status = present(&self.status);
        let payment_status = present(&self.payment_status);
        if status.is_none() && payment_status.is_none() {
            return Err(OrderError::EmptyStatusUpdate);
        }

        Ok(OrderPatch {
            status: status.map(|s| s.parse::<OrderStatus>()).transpose()?,
            payment_status: payment_status
                .map(|s| s.parse::<PaymentStatus>())
                .transpose()?,
        })
    }
}

/// Query string of `GET /orders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    #[serde(rename = "paymentStatus", alias = "payment_status")]
    pub payment_status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Resolved 1-based page and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        (self.page as usize).saturating_sub(1) * self.limit as usize
    }

    pub fn meta(&self, total: u64) -> PageMeta {
        PageMeta {
            total,
            page: self.page,
            limit: self.limit,
            pages: total.div_ceil(u64::from(self.limit.max(1))),
        }
    }
}

/// Parses a `from`/`to` bound: RFC 3339, or a bare date at midnight UTC.
fn parse_bound(field: &'static str, value: &str) -> Result<DateTime<Utc>, OrderError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| OrderError::InvalidFilter {
            field,
            value: value.to_string(),
        })
}

impl OrderListParams {
    /// Resolves paging. Zero or missing values fall back to the defaults and
    /// the page size is capped at `max_page_size`.
    pub fn page_request(&self, max_page_size: u32) -> PageRequest {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(max_page_size.max(1));
        PageRequest { page, limit }
    }

    /// Builds the store query for one page. Empty filters are ignored.
    pub fn to_query(&self, max_page_size: u32) -> Result<(OrderQuery, PageRequest), OrderError> {
        let paging = self.page_request(max_page_size);
        let mut query = OrderQuery::new()
            .limit(paging.limit as usize)
            .offset(paging.offset());

        if let Some(status) = present(&self.status) {
            query = query.status(status.parse()?);
        }
        if let Some(payment_status) = present(&self.payment_status) {
            query = query.payment_status(payment_status.parse()?);
        }
        if let Some(from) = present(&self.from) {
            query = query.from(parse_bound("from", from)?);
        }
        if let Some(to) = present(&self.to) {
            query = query.to(parse_bound("to", to)?);
        }

        Ok((query, paging))
    }
}

/// Paging metadata of an order listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

/// One page of orders with their items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderListing {
    pub data: Vec<OrderWithItems>,
    pub meta: PageMeta,
}
