use crate::catalog::Catalog;

/// How an amount is reached with the fewest packs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    /// Fewest packs summing exactly to the amount.
    pub(crate) packs: u32,
    /// Index into the table's pack widths of the pack added last.
    size_index: u32,
}

/// Minimum pack counts for every amount in `0..=max_amount`.
///
/// Unreachable amounts hold `None`; the table never stores a "large" count
/// standing in for impossible, so no arithmetic on it can overflow. Each entry
/// takes 12 bytes.
#[derive(Debug)]
pub(crate) struct ReachabilityTable {
    widths: Vec<usize>,
    steps: Vec<Option<Step>>,
}

impl ReachabilityTable {
    // Unbounded coin change, one pack size at a time:
    //
    //   steps[a] = min(steps[a], steps[a - size] + 1)
    //
    // Sizes are visited in ascending order and only a strictly smaller count
    // replaces an entry, so ties keep the smallest size that achieved the
    // minimum first. This keeps reconstruction deterministic.
    pub(crate) fn build(catalog: &Catalog, max_amount: usize) -> ReachabilityTable {
        // Sizes past the bound can never contribute. The catalog is sorted, so
        // the usable ones form a prefix.
        let widths: Vec<usize> = catalog
            .sizes()
            .iter()
            .map_while(|&size| usize::try_from(size).ok().filter(|&width| width <= max_amount))
            .collect();

        let mut steps = vec![None; max_amount + 1];

        // Zero items take zero packs. Every other entry starts unreachable.
        steps[0] = Some(Step { packs: 0, size_index: 0 });

        for (index, &width) in widths.iter().enumerate() {
            let Ok(size_index) = u32::try_from(index) else {
                break;
            };
            for amount in width..=max_amount {
                let Some(remainder) = steps[amount - width] else {
                    continue;
                };
                let candidate = remainder.packs + 1;
                match steps[amount] {
                    Some(current) if current.packs <= candidate => {}
                    _ => steps[amount] = Some(Step { packs: candidate, size_index }),
                }
            }
        }

        ReachabilityTable { widths, steps }
    }

    pub(crate) fn max_amount(&self) -> usize {
        self.steps.len() - 1
    }

    pub(crate) fn step(&self, amount: usize) -> Option<Step> {
        self.steps.get(amount).copied().flatten()
    }

    pub(crate) fn is_reachable(&self, amount: usize) -> bool {
        self.step(amount).is_some()
    }

    /// Width of the pack added last to reach an amount via `step`.
    pub(crate) fn last_width(&self, step: Step) -> usize {
        self.widths[step.size_index as usize]
    }
}
