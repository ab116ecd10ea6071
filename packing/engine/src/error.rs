use thiserror::Error;

use crate::catalog::MAX_PLAN_AMOUNT;

/// Reasons a plan could not be computed.
///
/// Everything except [`PlanError::NoReachableAmount`] is an input validation
/// failure detected before the reachability table is built.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// The order asked for zero items.
    #[error("order quantity must be greater than 0")]
    InvalidQuantity,

    /// The catalog has no pack sizes.
    #[error("no pack sizes available")]
    EmptyCatalog,

    /// The catalog contains a pack that holds no items, or more than the
    /// planner can search.
    #[error("pack size {0} is out of range (expected 1 to {max})", max = MAX_PLAN_AMOUNT)]
    InvalidPackSize(u64),

    /// The order plus one smallest pack goes past the largest amount the
    /// planner can search.
    #[error("order quantity {0} plus one smallest pack exceeds the planning limit of {max} items", max = MAX_PLAN_AMOUNT)]
    QuantityOutOfRange(u64),

    /// No amount at or above the order was reachable. Cannot happen for a
    /// validated catalog.
    #[error("no reachable amount covers an order of {0} items")]
    NoReachableAmount(u64),
}
