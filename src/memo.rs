use std::collections::HashMap;

use derive_new::new;

/// A p-value together with the statistic it was derived from
#[derive(Debug, Clone, Copy, PartialEq, new)]
pub struct PValue {
    pub pvalue: f64,
    pub statistic: f64,
}

/// Memo of p-values keyed by contingency-table shape
///
/// The key is `(row_total, cell_value)`: the number of transactions covered
/// by a combination and how many of those are positive. Entries are never
/// invalidated within a run.
#[derive(Debug, Default)]
pub struct PValueMemo {
    table: HashMap<(usize, usize), PValue>,
}
impl PValueMemo {
    pub fn get(&self, row_total: usize, cell_value: usize) -> Option<PValue> {
        self.table.get(&(row_total, cell_value)).copied()
    }

    pub fn put(&mut self, row_total: usize, cell_value: usize, pvalue: f64, statistic: f64) {
        self.table
            .insert((row_total, cell_value), PValue::new(pvalue, statistic));
    }

    /// Returns the stored entry or computes, stores and returns it
    pub fn get_or_insert_with<F>(&mut self, row_total: usize, cell_value: usize, f: F) -> PValue
    where
        F: FnOnce() -> PValue,
    {
        *self.table.entry((row_total, cell_value)).or_insert_with(f)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_put() {
        let mut memo = PValueMemo::default();
        assert!(memo.get(5, 3).is_none());
        memo.put(5, 3, 0.01, 3.0);
        assert_eq!(memo.get(5, 3), Some(PValue::new(0.01, 3.0)));
        assert!(memo.get(3, 5).is_none());
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_get_or_insert_computes_once() {
        let mut memo = PValueMemo::default();
        let mut calls = 0;
        for _ in 0..3 {
            let entry = memo.get_or_insert_with(4, 2, || {
                calls += 1;
                PValue::new(0.2, 2.0)
            });
            assert_eq!(entry.pvalue, 0.2);
        }
        assert_eq!(calls, 1);
    }
}
