use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::code::{business_code, random_suffix};

/// Store-assigned surrogate key of an order.
///
/// Opaque to customers; they see the [`OrderNumber`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Wraps a raw key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<OrderId> for i64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Customer-facing order number, e.g. `PED202501311234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Literal prefix of every generated order number.
    pub const PREFIX: &'static str = "PED";

    /// Generates a number for today's UTC date.
    pub fn generate() -> Self {
        Self::generate_on(Utc::now().date_naive())
    }

    /// Generates a number for the given date with a random suffix.
    pub fn generate_on(date: NaiveDate) -> Self {
        Self(business_code(Self::PREFIX, date, random_suffix()))
    }

    /// Returns the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Business code of a table reservation, e.g. `RES202501311234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationCode(String);

impl ReservationCode {
    /// Literal prefix of every generated reservation code.
    pub const PREFIX: &'static str = "RES";

    /// Generates a code for today's UTC date.
    pub fn generate() -> Self {
        Self::generate_on(Utc::now().date_naive())
    }

    /// Generates a code for the given date with a random suffix.
    pub fn generate_on(date: NaiveDate) -> Self {
        Self(business_code(Self::PREFIX, date, random_suffix()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReservationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReservationCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReservationCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Row predicate selecting a single order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderKey {
    /// Match on the surrogate key.
    Id(OrderId),
    /// Match on the business order number.
    Number(OrderNumber),
}

impl std::fmt::Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKey::Id(id) => write!(f, "id={id}"),
            OrderKey::Number(number) => write!(f, "order_number={number}"),
        }
    }
}
