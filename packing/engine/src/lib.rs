//! Pack optimization: given pack sizes and an order quantity, choose the packs
//! that ship the fewest items and, among those, the fewest packs.
//!
//! ```
//! use pack_engine::compute_plan;
//!
//! let plan = compute_plan(&[250, 500, 1000, 2000, 5000], 12001).unwrap();
//! assert_eq!(plan.count(5000), 2);
//! assert_eq!(plan.count(2000), 1);
//! assert_eq!(plan.count(250), 1);
//! assert_eq!(plan.total_items(), 12250);
//! ```

mod catalog;
mod error;
mod plan;
mod table;

pub use catalog::{Catalog, PackSize, MAX_PLAN_AMOUNT};
pub use error::PlanError;
pub use plan::PackPlan;

/// Pack sizes offered when nothing else has been configured.
pub const DEFAULT_PACK_SIZES: [u64; 5] = [250, 500, 1000, 2000, 5000];

/// Plans an order of `quantity` items from `sizes`.
///
/// `sizes` may be in any order and contain duplicates. It is never modified.
pub fn compute_plan(sizes: &[u64], quantity: u64) -> Result<PackPlan, PlanError> {
    if quantity == 0 {
        return Err(PlanError::InvalidQuantity);
    }
    Catalog::new(sizes.iter().copied())?.plan(quantity)
}
