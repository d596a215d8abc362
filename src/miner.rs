use std::ops::RangeInclusive;

use derive_new::new;
use rayon::prelude::*;

use crate::{
    chi,
    config::TestKind,
    error::MiningError,
    fisher::bound_ratio,
    transaction::Transaction,
    utils::intersect_sorted,
};

/// A mined feature combination and the transactions containing all of it
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ItemsetRecord {
    /// Sorted feature indices
    pub items: Vec<usize>,
    /// Ascending ids of the covering transactions
    pub coverage: Vec<usize>,
}
impl ItemsetRecord {
    pub fn support(&self) -> usize {
        self.coverage.len()
    }

    pub fn arity(&self) -> usize {
        self.items.len()
    }
}

/// Enumerates feature combinations by support
///
/// Implementations must be deterministic and all-or-nothing: a failed call
/// returns no records.
pub trait PatternMiner {
    /// Every itemset with support inside `window`
    ///
    /// With `arity_limit == None` only closed itemsets are produced, otherwise
    /// every frequent itemset of at most `arity_limit` features.
    fn enumerate(
        &self,
        transactions: &[Transaction],
        window: RangeInclusive<usize>,
        arity_limit: Option<usize>,
    ) -> Result<Vec<ItemsetRecord>, MiningError>;

    /// Minimum support found by a search built into the mining pass
    ///
    /// Returns `None` when the miner has no such search for `test`.
    fn search_threshold(
        &self,
        _transactions: &[Transaction],
        _positive_count: usize,
        _test: TestKind,
        _significance: f64,
        _arity_limit: Option<usize>,
    ) -> Result<Option<usize>, MiningError> {
        Ok(None)
    }
}

/// Depth-first miner over per-feature tidsets
///
/// Closed itemsets are enumerated with prefix-preserving closure extension,
/// so every closed itemset is reached exactly once. Window enumeration runs
/// the first-level branches in parallel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceMiner;
impl PatternMiner for ReferenceMiner {
    fn enumerate(
        &self,
        transactions: &[Transaction],
        window: RangeInclusive<usize>,
        arity_limit: Option<usize>,
    ) -> Result<Vec<ItemsetRecord>, MiningError> {
        let lattice = Lattice::new(transactions, arity_limit)?;
        let (low, high) = (*window.start(), *window.end());
        if low > high {
            return Ok(Vec::new());
        }

        let (root, all) = lattice.root();
        let mut head = WindowCollector::new(low, high);
        if !root.is_empty() && all.len() >= low {
            head.visit(&root, &all);
        }
        let branches = lattice
            .first_level(&root)
            .into_par_iter()
            .map(|item| {
                let mut collector = WindowCollector::new(low, high);
                lattice.branch(&root, &all, item, &mut collector);
                collector.records
            })
            .collect::<Vec<_>>();

        let mut records = head.records;
        records.extend(branches.into_iter().flatten());
        Ok(records)
    }

    fn search_threshold(
        &self,
        transactions: &[Transaction],
        positive_count: usize,
        test: TestKind,
        significance: f64,
        arity_limit: Option<usize>,
    ) -> Result<Option<usize>, MiningError> {
        if !test.is_binary() {
            return Ok(None);
        }
        let lattice = Lattice::new(transactions, arity_limit)?;
        let mut search = ThresholdSearch::new(
            test,
            transactions.len(),
            positive_count,
            significance,
        );

        let (root, all) = lattice.root();
        if !root.is_empty() {
            search.visit(&root, &all);
        }
        for item in lattice.first_level(&root) {
            lattice.branch(&root, &all, item, &mut search);
        }
        Ok(Some(search.minimum_support()))
    }
}

/// Receives itemsets during the depth-first walk
trait Visitor {
    /// Branches whose support drops below this value are pruned
    fn min_support(&self) -> usize;

    fn visit(&mut self, items: &[usize], coverage: &[usize]);
}

struct WindowCollector {
    low: usize,
    high: usize,
    records: Vec<ItemsetRecord>,
}
impl WindowCollector {
    fn new(low: usize, high: usize) -> Self {
        Self {
            low,
            high,
            records: Vec::new(),
        }
    }
}
impl Visitor for WindowCollector {
    fn min_support(&self) -> usize {
        self.low
    }

    fn visit(&mut self, items: &[usize], coverage: &[usize]) {
        if coverage.len() <= self.high {
            self.records
                .push(ItemsetRecord::new(items.to_vec(), coverage.to_vec()));
        }
    }
}

/// Tarone's rule evaluated on a support histogram while mining
///
/// `count` is the number of itemsets seen with support at least `lambda`.
/// Whenever it reaches `significance / f(lambda - 1)` the minimum support is
/// raised and the itemsets of the old minimum are dropped from the count.
struct ThresholdSearch {
    test: TestKind,
    total: usize,
    positives: usize,
    significance: f64,
    /// Highest minimum support worth reaching
    cap: usize,
    lambda: usize,
    count: usize,
    histogram: Vec<usize>,
    /// `f(lambda - 1)`
    bound: f64,
}
impl ThresholdSearch {
    fn new(test: TestKind, total: usize, positives: usize, significance: f64) -> Self {
        Self {
            test,
            total,
            positives,
            significance,
            cap: positives.min(total - positives),
            lambda: 1,
            count: 0,
            histogram: vec![0; total + 1],
            bound: 1.0,
        }
    }

    fn threshold(&self) -> f64 {
        self.significance / self.bound
    }

    /// Replaces `f(lambda - 1)` by `f(lambda)`
    ///
    /// The chi-square bound only scores the most positive table.
    fn advance_bound(&mut self) {
        self.bound = match self.test {
            TestKind::Fisher => self.bound * bound_ratio(self.total, self.positives, self.lambda),
            _ => chi::most_positive_pvalue(self.total, self.positives, self.lambda),
        };
    }

    fn minimum_support(&self) -> usize {
        (self.lambda - 1).max(1)
    }
}
impl Visitor for ThresholdSearch {
    fn min_support(&self) -> usize {
        self.lambda
    }

    fn visit(&mut self, _items: &[usize], coverage: &[usize]) {
        let support = coverage.len();
        if support < self.lambda {
            return;
        }
        self.histogram[support] += 1;
        self.count += 1;
        while self.count as f64 >= self.threshold() && self.lambda <= self.cap {
            self.count -= self.histogram[self.lambda];
            self.histogram[self.lambda] = 0;
            self.advance_bound();
            self.lambda += 1;
            tracing::debug!(
                "minimum support raised to {} ({} itemsets, threshold {:.3e})",
                self.lambda,
                self.count,
                self.threshold()
            );
        }
    }
}

/// Vertical view of the transactions: one ascending tidset per feature
struct Lattice<'a> {
    transactions: &'a [Transaction],
    tidsets: Vec<Vec<usize>>,
    arity_limit: Option<usize>,
}
impl<'a> Lattice<'a> {
    fn new(
        transactions: &'a [Transaction],
        arity_limit: Option<usize>,
    ) -> Result<Self, MiningError> {
        let n_items = transactions
            .iter()
            .filter_map(|t| t.features.last())
            .max()
            .map_or(0, |&last| last + 1);
        let mut tidsets = vec![Vec::new(); n_items];
        for (position, t) in transactions.iter().enumerate() {
            if t.id != position {
                return Err(MiningError::new(format!(
                    "transaction \"{}\" has id {} at position {}",
                    t.name, t.id, position
                )));
            }
            for &f in &t.features {
                tidsets[f].push(t.id);
            }
        }
        Ok(Self {
            transactions,
            tidsets,
            arity_limit,
        })
    }

    fn closed(&self) -> bool {
        self.arity_limit.is_none()
    }

    /// The starting itemset and its coverage (every transaction)
    ///
    /// In closed mode this is the closure of the empty set.
    fn root(&self) -> (Vec<usize>, Vec<usize>) {
        let all: Vec<usize> = (0..self.transactions.len()).collect();
        let root = if self.closed() && !all.is_empty() {
            self.closure(&all)
        } else {
            Vec::new()
        };
        (root, all)
    }

    fn first_level(&self, root: &[usize]) -> Vec<usize> {
        (0..self.tidsets.len())
            .filter(|item| root.binary_search(item).is_err())
            .collect()
    }

    /// Walks the subtree of `items` extended by `item`
    fn branch<V: Visitor>(&self, items: &[usize], coverage: &[usize], item: usize, visitor: &mut V) {
        if self.closed() {
            self.extend_closed(items, coverage, item, visitor);
        } else {
            let mut prefix = items.to_vec();
            self.extend_frequent(&mut prefix, coverage, item, visitor);
        }
    }

    /// Features shared by every transaction of a non-empty coverage
    fn closure(&self, coverage: &[usize]) -> Vec<usize> {
        let mut items = self.transactions[coverage[0]].features.clone();
        for &id in &coverage[1..] {
            let features = &self.transactions[id].features;
            items.retain(|item| features.binary_search(item).is_ok());
            if items.is_empty() {
                break;
            }
        }
        items
    }

    fn extend_closed<V: Visitor>(
        &self,
        items: &[usize],
        coverage: &[usize],
        item: usize,
        visitor: &mut V,
    ) {
        let min_support = visitor.min_support().max(1);
        if self.tidsets[item].len() < min_support {
            return;
        }
        let next = intersect_sorted(coverage, &self.tidsets[item]);
        if next.len() < min_support {
            return;
        }
        let closed = self.closure(&next);
        // prefix preservation: the closure may not add features below `item`
        if closed
            .iter()
            .take_while(|&&i| i < item)
            .any(|i| items.binary_search(i).is_err())
        {
            return;
        }
        visitor.visit(&closed, &next);
        for candidate in item + 1..self.tidsets.len() {
            if closed.binary_search(&candidate).is_err() {
                self.extend_closed(&closed, &next, candidate, visitor);
            }
        }
    }

    fn extend_frequent<V: Visitor>(
        &self,
        items: &mut Vec<usize>,
        coverage: &[usize],
        item: usize,
        visitor: &mut V,
    ) {
        let limit = self.arity_limit.unwrap_or(usize::MAX);
        if items.len() >= limit {
            return;
        }
        let min_support = visitor.min_support().max(1);
        if self.tidsets[item].len() < min_support {
            return;
        }
        let next = intersect_sorted(coverage, &self.tidsets[item]);
        if next.len() < min_support {
            return;
        }
        items.push(item);
        visitor.visit(items, &next);
        for candidate in item + 1..self.tidsets.len() {
            self.extend_frequent(items, &next, candidate, visitor);
        }
        items.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionStore;

    /// Three features over six transactions
    ///
    /// A: 0 1 2 3, B: 0 1 2 4, C: 0 1 5
    fn store() -> TransactionStore {
        let rows = vec![
            ("t0".to_string(), vec![0, 1, 2], 1.0),
            ("t1".to_string(), vec![0, 1, 2], 2.0),
            ("t2".to_string(), vec![0, 1], 3.0),
            ("t3".to_string(), vec![0], 4.0),
            ("t4".to_string(), vec![1], 5.0),
            ("t5".to_string(), vec![2], 6.0),
        ];
        let names = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        TransactionStore::new(names, rows).unwrap()
    }

    fn sorted(mut records: Vec<ItemsetRecord>) -> Vec<(Vec<usize>, Vec<usize>)> {
        records.sort_by(|a, b| a.items.cmp(&b.items));
        records.into_iter().map(|r| (r.items, r.coverage)).collect()
    }

    #[test]
    fn test_closed_itemsets() {
        let store = store();
        let records = ReferenceMiner
            .enumerate(store.transactions(), 1..=usize::MAX, None)
            .unwrap();
        // {A, C} and {B, C} share the coverage of {A, B, C} and are not closed
        assert_eq!(
            sorted(records),
            vec![
                (vec![0], vec![0, 1, 2, 3]),
                (vec![0, 1], vec![0, 1, 2]),
                (vec![0, 1, 2], vec![0, 1]),
                (vec![1], vec![0, 1, 2, 4]),
                (vec![2], vec![0, 1, 5]),
            ]
        );
    }

    #[test]
    fn test_frequent_itemsets_with_arity_limit() {
        let store = store();
        let records = ReferenceMiner
            .enumerate(store.transactions(), 1..=usize::MAX, Some(2))
            .unwrap();
        assert_eq!(
            sorted(records),
            vec![
                (vec![0], vec![0, 1, 2, 3]),
                (vec![0, 1], vec![0, 1, 2]),
                (vec![0, 2], vec![0, 1]),
                (vec![1], vec![0, 1, 2, 4]),
                (vec![1, 2], vec![0, 1]),
                (vec![2], vec![0, 1, 5]),
            ]
        );
    }

    #[test]
    fn test_window_bounds() {
        let store = store();
        let records = ReferenceMiner
            .enumerate(store.transactions(), 3..=3, None)
            .unwrap();
        assert_eq!(
            sorted(records),
            vec![(vec![0, 1], vec![0, 1, 2]), (vec![2], vec![0, 1, 5])]
        );
        let empty = ReferenceMiner
            .enumerate(store.transactions(), 5..=4, None)
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_root_closure_is_reported() {
        let rows = vec![
            ("t0".to_string(), vec![0, 1], 0.0),
            ("t1".to_string(), vec![0], 1.0),
        ];
        let names = vec!["A".to_string(), "B".to_string()];
        let store = TransactionStore::new(names, rows).unwrap();
        let records = ReferenceMiner
            .enumerate(store.transactions(), 1..=usize::MAX, None)
            .unwrap();
        assert_eq!(
            sorted(records),
            vec![(vec![0], vec![0, 1]), (vec![0, 1], vec![0])]
        );
    }

    #[test]
    fn test_ids_must_match_positions() {
        let store = store();
        let mut transactions = store.transactions().to_vec();
        transactions.swap(0, 1);
        let err = ReferenceMiner
            .enumerate(&transactions, 1..=usize::MAX, None)
            .unwrap_err();
        assert!(err.message.contains("t1"));
    }

    #[test]
    fn test_search_unsupported_for_u_test() {
        let store = store();
        let result = ReferenceMiner
            .search_threshold(store.transactions(), 3, TestKind::MannWhitneyU, 0.05, None)
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_search_single_feature() {
        // f(3) = 1/12 and f(4) = 1/42 bracket the single itemset at lambda = 4
        let rows = (0..10)
            .map(|i| (format!("t{i}"), vec![0], if i < 5 { 1.0 } else { 0.0 }))
            .collect();
        let store = TransactionStore::new(vec!["A".to_string()], rows).unwrap();
        let lambda = ReferenceMiner
            .search_threshold(store.transactions(), 5, TestKind::Fisher, 0.05, None)
            .unwrap();
        assert_eq!(lambda, Some(4));
    }

    #[test]
    fn test_search_falls_back_to_one() {
        // five closed itemsets never reach alpha / f(0) = 10
        let store = store();
        let lambda = ReferenceMiner
            .search_threshold(store.transactions(), 3, TestKind::ChiSquare, 10.0, None)
            .unwrap();
        assert_eq!(lambda, Some(1));
    }

    #[test]
    fn test_search_raises_to_cap_for_tiny_alpha() {
        let store = store();
        let lambda = ReferenceMiner
            .search_threshold(store.transactions(), 3, TestKind::ChiSquare, 1e-9, None)
            .unwrap();
        assert_eq!(lambda, Some(3));
    }

    #[test]
    fn test_chi_search_with_more_positives() {
        // 20 positives and 10 negatives; A and B each cover 15 samples.
        // The first itemset raises lambda while 1 >= alpha / f(lambda - 1), up to
        // f(7) = 0.0466. The second one pushes it past f(8) = 0.0289 and stops
        // at f(9) = 0.0173, since 2 < 0.05 / 0.0173.
        let rows = (0..30)
            .map(|i| {
                let features = if i < 15 { vec![0] } else { vec![1] };
                let value = if i < 20 { 1.0 } else { 0.0 };
                (format!("t{i}"), features, value)
            })
            .collect();
        let names = vec!["A".to_string(), "B".to_string()];
        let store = TransactionStore::new(names, rows).unwrap();
        let lambda = ReferenceMiner
            .search_threshold(store.transactions(), 20, TestKind::ChiSquare, 0.05, None)
            .unwrap();
        assert_eq!(lambda, Some(9));
    }
}
