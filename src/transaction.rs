use derive_new::new;
use itertools::Itertools;

use crate::error::DataError;

/// A single sample: its features and its outcome value
#[derive(Debug, Clone, PartialEq, new)]
pub struct Transaction {
    /// Position in the ascending-by-value ordering of the store
    pub id: usize,
    pub name: String,
    /// Sorted, de-duplicated feature indices
    pub features: Vec<usize>,
    pub value: f64,
}

/// The samples of one run, kept sorted ascending by outcome value
///
/// Every transaction's `id` equals its position, so a coverage list of ids is
/// also a list of ranks. The Mann-Whitney engine depends on this ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
    feature_names: Vec<String>,
}
impl TransactionStore {
    /// Builds a store from `(name, features, value)` rows
    ///
    /// Rows are sorted stably by value and their features sorted and
    /// de-duplicated.
    pub fn new(
        feature_names: Vec<String>,
        rows: Vec<(String, Vec<usize>, f64)>,
    ) -> Result<Self, DataError> {
        if rows.is_empty() {
            return Err(DataError::NoTransactions);
        }
        let mut transactions = Vec::with_capacity(rows.len());
        for (name, features, value) in rows {
            if let Some(&feature) = features.iter().find(|&&f| f >= feature_names.len()) {
                return Err(DataError::UnknownFeature {
                    name,
                    feature,
                    features: feature_names.len(),
                });
            }
            let features = features.into_iter().sorted_unstable().dedup().collect();
            transactions.push(Transaction::new(0, name, features, value));
        }
        transactions.sort_by(|a, b| a.value.total_cmp(&b.value));
        let mut store = Self {
            transactions,
            feature_names,
        };
        store.assign_ids();
        Ok(store)
    }

    fn assign_ids(&mut self) {
        for (id, t) in self.transactions.iter_mut().enumerate() {
            t.id = id;
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Outcome values in store order (ascending)
    pub fn values(&self) -> Vec<f64> {
        self.transactions.iter().map(|t| t.value).collect()
    }

    pub fn positive_sum(&self) -> f64 {
        self.transactions.iter().map(|t| t.value).sum()
    }

    /// Number of transactions containing each feature
    pub fn feature_frequencies(&self) -> Vec<usize> {
        let mut counts = vec![0; self.feature_names.len()];
        for t in &self.transactions {
            for &f in &t.features {
                counts[f] += 1;
            }
        }
        counts
    }

    /// The largest support worth considering as a minimum support
    ///
    /// This is the highest single-feature frequency, capped at half the number
    /// of transactions.
    pub fn max_lambda(&self) -> usize {
        let max_frequency = self.feature_frequencies().into_iter().max().unwrap_or(0);
        max_frequency.min(self.transactions.len() / 2)
    }

    /// Flips the outcome direction so a "less" test can run as "greater"
    ///
    /// Binary values become `1 - v`, continuous values `-v`. The order is then
    /// reversed and ids reassigned, which keeps the store ascending.
    pub fn reverse_values(&mut self, binary: bool) {
        for t in self.transactions.iter_mut() {
            t.value = if binary { 1.0 - t.value } else { -t.value };
        }
        self.transactions.reverse();
        self.assign_ids();
    }
}
