use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::plan::{self, PackPlan};
use crate::table::ReachabilityTable;

/// Largest amount the planner searches: an order plus one smallest pack must
/// not go past it. Also the largest pack size a catalog accepts.
pub const MAX_PLAN_AMOUNT: u64 = u32::MAX as u64;

/// A pack as persisted by catalog providers: `{"maxItems": 250}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackSize {
    /// Number of items that fit in the pack.
    #[serde(rename = "maxItems")]
    pub max_items: u64,
}

impl PackSize {
    pub fn new(max_items: u64) -> PackSize {
        PackSize { max_items }
    }
}

impl From<u64> for PackSize {
    fn from(max_items: u64) -> Self {
        PackSize::new(max_items)
    }
}

/// A validated set of pack sizes: non-empty, positive, ascending and free of
/// duplicates.
///
/// Building a `Catalog` copies the caller's sizes, so planning never touches
/// caller-owned data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    sizes: Vec<u64>,
}

impl Catalog {
    pub fn new(sizes: impl IntoIterator<Item = u64>) -> Result<Catalog, PlanError> {
        let mut sizes: Vec<u64> = sizes.into_iter().collect();
        if sizes.is_empty() {
            return Err(PlanError::EmptyCatalog);
        }
        if let Some(&size) = sizes.iter().find(|&&size| size == 0 || size > MAX_PLAN_AMOUNT) {
            return Err(PlanError::InvalidPackSize(size));
        }
        sizes.sort_unstable();
        sizes.dedup();
        Ok(Catalog { sizes })
    }

    pub fn from_pack_sizes(packs: &[PackSize]) -> Result<Catalog, PlanError> {
        Catalog::new(packs.iter().map(|pack| pack.max_items))
    }

    /// Sizes in ascending order.
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    pub fn smallest(&self) -> u64 {
        self.sizes[0]
    }

    pub fn to_pack_sizes(&self) -> Vec<PackSize> {
        self.sizes.iter().copied().map(PackSize::new).collect()
    }

    /// Plans an order of `quantity` items: fewest items shipped first, then
    /// fewest packs.
    pub fn plan(&self, quantity: u64) -> Result<PackPlan, PlanError> {
        if quantity == 0 {
            return Err(PlanError::InvalidQuantity);
        }

        // One extra smallest pack on top of the order always lands on a
        // reachable amount, so nothing past it needs to be searched.
        let max_amount = quantity
            .checked_add(self.smallest())
            .filter(|&amount| amount <= MAX_PLAN_AMOUNT)
            .and_then(|amount| usize::try_from(amount).ok())
            .ok_or(PlanError::QuantityOutOfRange(quantity))?;
        let order = usize::try_from(quantity).map_err(|_| PlanError::QuantityOutOfRange(quantity))?;

        let table = ReachabilityTable::build(self, max_amount);
        plan::select(&table, order)
    }
}
