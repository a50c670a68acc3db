//! Fulfillment status transition table.

use std::str::FromStr;

use common::OrderStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How strictly fulfillment status updates are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Only moves allowed by [`can_transition`] are accepted.
    Strict,
    /// Any status in the domain is accepted, whatever the current one.
    #[default]
    Permissive,
}

/// An unrecognized transition policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transition policy '{0}'. Valid values: strict, permissive")]
pub struct ParsePolicyError(pub String);

impl TransitionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::Strict => "strict",
            TransitionPolicy::Permissive => "permissive",
        }
    }

    /// Statuses an order may currently hold for a move to `to` to be
    /// accepted, or `None` when any current status is accepted.
    pub fn allowed_sources(&self, to: OrderStatus) -> Option<Vec<OrderStatus>> {
        match self {
            TransitionPolicy::Permissive => None,
            TransitionPolicy::Strict => Some(sources_of(to)),
        }
    }
}

impl std::fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TransitionPolicy::Strict),
            "permissive" => Ok(TransitionPolicy::Permissive),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Position along the forward path, `None` for `cancelled`.
fn rank(status: OrderStatus) -> Option<u8> {
    match status {
        OrderStatus::Pending => Some(0),
        OrderStatus::Confirmed => Some(1),
        OrderStatus::Preparing => Some(2),
        OrderStatus::Ready => Some(3),
        OrderStatus::Completed => Some(4),
        OrderStatus::Cancelled => None,
    }
}

/// Returns true if the fulfillment status may move from `from` to `to`.
///
/// Statuses move forward along `pending → confirmed → preparing → ready →
/// completed`, possibly skipping steps, or to `cancelled` from any
/// non-terminal state. Rewriting the current value is always allowed.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if from == to {
        return true;
    }
    if from.is_terminal() {
        return false;
    }
    match (rank(from), rank(to)) {
        (_, None) => true,
        (Some(current), Some(next)) => next > current,
        (None, Some(_)) => false,
    }
}

/// Every status from which `to` is reachable, `to` itself included.
pub fn sources_of(to: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|from| can_transition(*from, to))
        .collect()
}
