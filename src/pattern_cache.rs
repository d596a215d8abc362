use crate::{
    engine::TestEngine,
    error::{LampError, MiningError, Result},
    miner::{ItemsetRecord, PatternMiner},
    transaction::Transaction,
};

/// Itemsets sharing one support value
#[derive(Debug, Default, Clone)]
pub struct SupportBucket {
    itemsets: Vec<ItemsetRecord>,
    /// Memoized `f(support)`, kept independently of the itemsets
    bound: Option<f64>,
    /// Number of itemsets with support at least this one
    total: usize,
}
impl SupportBucket {
    pub fn itemsets(&self) -> &[ItemsetRecord] {
        &self.itemsets
    }
}

/// Mined itemsets indexed by support, filled from the top down on demand
///
/// Bucket `max_support - s` holds the itemsets of support `s`; the top bucket
/// also holds every itemset whose support exceeds `max_support`. Populated
/// buckets always form the range `lowest_populated..=max_support`.
pub struct PatternCache<'a, M: PatternMiner + ?Sized> {
    miner: &'a M,
    transactions: &'a [Transaction],
    max_support: usize,
    buckets: Vec<SupportBucket>,
    lowest: Option<usize>,
}
impl<'a, M: PatternMiner + ?Sized> PatternCache<'a, M> {
    pub fn new(miner: &'a M, transactions: &'a [Transaction], max_support: usize) -> Self {
        Self {
            miner,
            transactions,
            max_support,
            buckets: vec![SupportBucket::default(); max_support],
            lowest: None,
        }
    }

    fn index(&self, support: usize) -> usize {
        self.max_support - support
    }

    pub fn max_support(&self) -> usize {
        self.max_support
    }

    /// Lowest support whose bucket is populated
    pub fn lowest_populated(&self) -> Option<usize> {
        self.lowest
    }

    /// Makes sure every bucket from `low` up is populated
    ///
    /// Only the missing range is mined. On a miner failure the cache keeps
    /// its previous contents.
    pub fn ensure(&mut self, low: usize, arity_limit: Option<usize>) -> Result<()> {
        if self.max_support == 0 {
            return Ok(());
        }
        let low = low.clamp(1, self.max_support);
        if self.lowest.is_some_and(|lowest| lowest <= low) {
            return Ok(());
        }
        let high = self.lowest.map_or(usize::MAX, |lowest| lowest - 1);
        let mining_error = |source| LampError::Mining {
            low_support: low,
            arity_limit,
            source,
        };

        let records = self
            .miner
            .enumerate(self.transactions, low..=high, arity_limit)
            .map_err(mining_error)?;

        let top = high.min(self.max_support);
        let mut staged = vec![Vec::new(); top - low + 1];
        for record in records {
            let support = record.support();
            if support < low || high < support {
                return Err(mining_error(MiningError::new(format!(
                    "itemset {:?} has support {support} outside the requested range {low}..={high}",
                    record.items
                ))));
            }
            staged[support.min(self.max_support) - low].push(record);
        }

        for support in (low..=top).rev() {
            let above = if support == self.max_support {
                0
            } else {
                self.buckets[self.index(support + 1)].total
            };
            let itemsets = staged.pop().unwrap_or_default();
            let index = self.index(support);
            let bucket = &mut self.buckets[index];
            bucket.total = above + itemsets.len();
            bucket.itemsets = itemsets;
        }
        self.lowest = Some(low);
        tracing::debug!(
            "populated supports {low}..={top}: {} itemsets at or above {low}",
            self.total_at_or_above(low)
        );
        Ok(())
    }

    /// `K(support)`: the number of cached itemsets with at least `support`
    ///
    /// Supports outside the populated range report 0.
    pub fn total_at_or_above(&self, support: usize) -> usize {
        let support = support.max(1);
        if support > self.max_support {
            return 0;
        }
        self.buckets[self.index(support)].total
    }

    /// Memoized `engine.bound(support)`; `f(0)` is 1
    pub fn bound_at(&mut self, support: usize, engine: &mut TestEngine) -> f64 {
        if support == 0 {
            return 1.0;
        }
        if support > self.max_support {
            return engine.bound(support);
        }
        let index = self.index(support);
        *self.buckets[index]
            .bound
            .get_or_insert_with(|| engine.bound(support))
    }

    /// Itemsets of exactly `support`, empty outside the populated range
    pub fn itemsets_at(&self, support: usize) -> &[ItemsetRecord] {
        match self.lowest {
            Some(lowest) if (lowest..=self.max_support).contains(&support) => {
                self.buckets[self.index(support)].itemsets()
            }
            _ => &[],
        }
    }
}
