use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PlanError;
use crate::table::ReachabilityTable;

/// The packs chosen for an order, as pack size → number of packs.
///
/// Only sizes actually used are present, so the JSON form is an object such as
/// `{"250":1,"2000":1,"5000":2}` with no zero counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackPlan {
    packs: BTreeMap<u64, u64>,
}

impl PackPlan {
    pub fn new() -> PackPlan {
        PackPlan::default()
    }

    fn add(&mut self, size: u64) {
        *self.packs.entry(size).or_insert(0) += 1;
    }

    /// Number of packs of `size`, zero when the size is unused.
    pub fn count(&self, size: u64) -> u64 {
        self.packs.get(&size).copied().unwrap_or(0)
    }

    /// `(size, count)` pairs in ascending size order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.packs.iter().map(|(&size, &count)| (size, count))
    }

    /// Items shipped across every pack.
    pub fn total_items(&self) -> u64 {
        self.iter().map(|(size, count)| size * count).sum()
    }

    pub fn pack_count(&self) -> u64 {
        self.packs.values().sum()
    }

    /// Items shipped beyond `quantity`.
    pub fn surplus(&self, quantity: u64) -> u64 {
        self.total_items().saturating_sub(quantity)
    }

    pub fn into_inner(self) -> BTreeMap<u64, u64> {
        self.packs
    }
}

// Rejects zero sizes and zero counts so a decoded plan holds the same
// invariants as one built by the planner.
impl<'de> Deserialize<'de> for PackPlan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let packs = BTreeMap::<u64, u64>::deserialize(deserializer)?;
        if packs.contains_key(&0) {
            return Err(D::Error::custom("pack size must be at least 1"));
        }
        if let Some((size, _)) = packs.iter().find(|&(_, &count)| count == 0) {
            return Err(D::Error::custom(format!("pack size {} has a count of 0", size)));
        }
        Ok(PackPlan { packs })
    }
}

impl FromIterator<(u64, u64)> for PackPlan {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        let mut plan = PackPlan::new();
        for (size, count) in iter.into_iter().filter(|&(_, count)| count > 0) {
            *plan.packs.entry(size).or_insert(0) += count;
        }
        plan
    }
}

/// Picks the amount to ship and walks the table back to the packs that make
/// it up.
///
/// An exact match is taken when `quantity` is reachable. Otherwise the
/// smallest reachable amount above it wins, which is the least surplus; the
/// table already holds the fewest packs for that amount.
pub(crate) fn select(table: &ReachabilityTable, quantity: usize) -> Result<PackPlan, PlanError> {
    let target = (quantity..=table.max_amount())
        .find(|&amount| table.is_reachable(amount))
        .ok_or(PlanError::NoReachableAmount(quantity as u64))?;
    reconstruct(table, target, quantity)
}

fn reconstruct(table: &ReachabilityTable, target: usize, quantity: usize) -> Result<PackPlan, PlanError> {
    let mut plan = PackPlan::new();
    let mut remaining = target;
    while remaining > 0 {
        let step = table
            .step(remaining)
            .ok_or(PlanError::NoReachableAmount(quantity as u64))?;
        let width = table.last_width(step);
        plan.add(width as u64);
        remaining -= width;
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_plan_accessors() {
        let plan: PackPlan = [(5000, 2), (2000, 1), (250, 1), (1000, 0)].into_iter().collect();
        assert_eq!(plan.count(5000), 2);
        assert_eq!(plan.count(1000), 0);
        assert_eq!(plan.total_items(), 12250);
        assert_eq!(plan.pack_count(), 4);
        assert_eq!(plan.surplus(12001), 249);
        assert_eq!(plan.surplus(20000), 0);
        assert_eq!(plan.iter().collect::<Vec<_>>(), vec![(250, 1), (2000, 1), (5000, 2)]);
    }

    #[test]
    fn test_plan_json_omits_unused_sizes() {
        let plan: PackPlan = [(250, 1), (500, 0), (5000, 2)].into_iter().collect();
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(json, r#"{"250":1,"5000":2}"#);

        let back: PackPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_plan_json_rejects_zero_entries() {
        let err = serde_json::from_str::<PackPlan>(r#"{"250":0}"#).unwrap_err();
        assert!(err.to_string().contains("pack size 250 has a count of 0"), "{}", err);

        let err = serde_json::from_str::<PackPlan>(r#"{"0":3}"#).unwrap_err();
        assert!(err.to_string().contains("pack size must be at least 1"), "{}", err);

        let plan: PackPlan = serde_json::from_str("{}").unwrap();
        assert_eq!(plan.pack_count(), 0);
    }

    #[test]
    fn test_select_prefers_exact_amount() {
        let catalog = Catalog::new([3, 5]).unwrap();
        let table = ReachabilityTable::build(&catalog, 11);
        let plan = select(&table, 8).unwrap();
        assert_eq!(plan.into_inner(), BTreeMap::from([(3, 1), (5, 1)]));
    }

    #[test]
    fn test_select_takes_least_surplus() {
        // 7 is unreachable with {3, 5}; 8 = 3 + 5 beats 9 = 3 + 3 + 3.
        let catalog = Catalog::new([3, 5]).unwrap();
        let table = ReachabilityTable::build(&catalog, 10);
        let plan = select(&table, 7).unwrap();
        assert_eq!(plan.total_items(), 8);
        assert_eq!(plan.pack_count(), 2);
    }

    #[test]
    fn test_select_reports_missing_target() {
        let catalog = Catalog::new([10]).unwrap();
        let table = ReachabilityTable::build(&catalog, 9);
        assert_eq!(select(&table, 1), Err(PlanError::NoReachableAmount(1)));
    }
}
