use crate::{
    config::{Alternative, TestKind},
    engine::binary_positives,
    error::DataError,
    math::{normal_upper_tail, ContingencyTable},
    memo::{PValue, PValueMemo},
    transaction::TransactionStore,
};

/// Pearson's chi-square test over a binary outcome (one degree of freedom)
#[derive(Debug)]
pub struct ChiSquareTest {
    total: usize,
    positives: usize,
    two_sided: bool,
    is_positive: Vec<bool>,
    /// p-value and raw chi statistic keyed by `(x, a)`
    pvalues: PValueMemo,
}
impl ChiSquareTest {
    pub fn new(store: &TransactionStore, alternative: Alternative) -> Result<Self, DataError> {
        let is_positive = binary_positives(store, TestKind::ChiSquare)?;
        let positives = is_positive.iter().filter(|&&p| p).count();
        Ok(Self {
            total: store.len(),
            positives,
            two_sided: alternative.is_two_sided(),
            is_positive,
            pvalues: PValueMemo::default(),
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn positives(&self) -> usize {
        self.positives
    }

    pub fn bound(&self, x: usize) -> f64 {
        masl(self.total, self.positives, x, self.two_sided)
    }

    /// Exact p-value of a combination; the statistic is the covered positive count
    pub fn exact_pvalue(&mut self, coverage: &[usize]) -> PValue {
        let x = coverage.len();
        let a = coverage.iter().filter(|&&id| self.is_positive[id]).count();
        let entry = match self.pvalues.get(x, a) {
            Some(entry) => entry,
            None => {
                let table = ContingencyTable::from_coverage(x, a, self.total, self.positives);
                let chi = corrected_chi_square(&table);
                let mut p = chi_pvalue(chi);
                if self.two_sided {
                    p = (2.0 * p).min(1.0);
                } else if (a as f64) < (self.positives.min(x) as f64) / 2.0 {
                    p = 1.0 - p;
                }
                self.pvalues.put(x, a, p, chi);
                PValue::new(p, chi)
            }
        };
        PValue::new(entry.pvalue, a as f64)
    }
}

/// Chi statistic with Yates' correction applied when any expected count is below 5
pub fn corrected_chi_square(table: &ContingencyTable) -> f64 {
    table.chi_square(table.yates_correction())
}

/// One-sided p-value of a 1-dof chi statistic through its signed square root
pub fn chi_pvalue(chi: f64) -> f64 {
    if chi == 0.0 {
        1.0
    } else {
        normal_upper_tail(chi.sqrt())
    }
}

/// Minimum attainable p-value for a combination covering `x` of `total`
/// transactions with `positives` positives
///
/// Both extreme tables are scored: the covered transactions as positive as
/// possible, and all of them negative.
pub fn masl(total: usize, positives: usize, x: usize, two_sided: bool) -> f64 {
    let (n, n1, xf) = (total as f64, positives as f64, x as f64);
    let all_negative = ContingencyTable::new(0.0, xf, n1, n - n1 - xf);

    let mut p1 = most_positive_pvalue(total, positives, x);
    let mut p2 = chi_pvalue(corrected_chi_square(&all_negative));
    if two_sided {
        p1 = (p1 * 2.0).min(1.0);
        p2 = (p2 * 2.0).min(1.0);
    }
    p1.min(p2)
}

/// One-sided p-value of the table with as many covered positives as possible
///
/// This is the bound the mining-time search raises its minimum support with.
pub fn most_positive_pvalue(total: usize, positives: usize, x: usize) -> f64 {
    let (n, n1, xf) = (total as f64, positives as f64, x as f64);
    let table = if xf < n1 {
        ContingencyTable::new(xf, 0.0, n1 - xf, n - n1)
    } else {
        ContingencyTable::new(n1, xf - n1, 0.0, n - xf)
    };
    chi_pvalue(corrected_chi_square(&table))
}
