use crate::{
    config::{Alternative, TestKind},
    engine::binary_positives,
    error::DataError,
    memo::{PValue, PValueMemo},
    transaction::TransactionStore,
};

/// Probabilities this close are treated as equally extreme in the two-sided test
const TIE_TOLERANCE: f64 = 1e-16;

/// Fisher's exact test over a binary outcome
#[derive(Debug)]
pub struct FisherTest {
    total: usize,
    positives: usize,
    two_sided: bool,
    is_positive: Vec<bool>,
    /// Hypergeometric point probabilities keyed by `(x, a)`
    probabilities: PValueMemo,
    /// Exact p-values keyed by `(x, a)`
    pvalues: PValueMemo,
}
impl FisherTest {
    pub fn new(store: &TransactionStore, alternative: Alternative) -> Result<Self, DataError> {
        let is_positive = binary_positives(store, TestKind::Fisher)?;
        let positives = is_positive.iter().filter(|&&p| p).count();
        Ok(Self {
            total: store.len(),
            positives,
            two_sided: alternative.is_two_sided(),
            is_positive,
            probabilities: PValueMemo::default(),
            pvalues: PValueMemo::default(),
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn positives(&self) -> usize {
        self.positives
    }

    /// Hypergeometric probability that `a` of `x` covered transactions are positive
    ///
    /// Computed as a running product of ratios for `C(n1, a) C(n0, x - a) / C(n, x)`.
    pub fn probability(&mut self, x: usize, a: usize) -> f64 {
        if let Some(entry) = self.probabilities.get(x, a) {
            return entry.pvalue;
        }
        let p = point_probability(self.total, self.positives, x, a);
        self.probabilities.put(x, a, p, a as f64);
        p
    }

    /// Minimum attainable p-value of a combination covering `x` transactions
    pub fn bound(&mut self, x: usize) -> f64 {
        let x = x.min(self.total);
        self.probability(x, x.min(self.positives))
    }

    /// Exact p-value of a combination; the statistic is the covered positive count
    pub fn exact_pvalue(&mut self, coverage: &[usize]) -> PValue {
        let x = coverage.len();
        let a = coverage.iter().filter(|&&id| self.is_positive[id]).count();
        if let Some(entry) = self.pvalues.get(x, a) {
            return entry;
        }

        let p0 = self.probability(x, a);
        let pos_max = x.min(self.positives);
        let mut p = p0;
        if self.two_sided {
            // lower tail, walking up from a' = 0
            for lower in 0..a {
                let pa = self.probability(x, lower);
                if TIE_TOLERANCE < pa - p0 {
                    break;
                }
                p += pa;
            }
            // upper tail, walking down from the most extreme table
            for upper in (a + 1..=pos_max).rev() {
                let pa = self.probability(x, upper);
                if TIE_TOLERANCE < pa - p0 {
                    break;
                }
                p += pa;
            }
        } else {
            for upper in a + 1..=pos_max {
                p += self.probability(x, upper);
            }
        }

        self.pvalues.put(x, a, p, a as f64);
        PValue::new(p, a as f64)
    }
}

/// `C(n1, a) C(n0, x - a) / C(n, x)` without evaluating factorials
pub fn point_probability(total: usize, positives: usize, x: usize, a: usize) -> f64 {
    let negatives = total - positives;
    if a > x || a > positives || x - a > negatives || x > total {
        return 0.0;
    }
    let b = x - a;
    let (n, n1, n0) = (total as f64, positives as f64, negatives as f64);
    let (xf, af) = (x as f64, a as f64);
    let mut p = 1.0;
    for i in 0..a {
        let i = i as f64;
        p *= (n1 - i) / (af - i);
        p *= (xf - i) / (n - i);
    }
    for i in 0..b {
        let i = i as f64;
        p *= (n0 - i) / (b as f64 - i);
        let shift = af + i;
        p *= (xf - shift) / (n - shift);
    }
    p
}

/// Ratio `f(x) / f(x - 1)` of consecutive Fisher bounds, for `1 <= x <= total`
///
/// Lets a caller walk the bound upward by one support at a time.
pub fn bound_ratio(total: usize, positives: usize, x: usize) -> f64 {
    let (n, n1) = (total as f64, positives as f64);
    let xf = x as f64;
    if x <= positives {
        (n1 - xf + 1.0) / (n - xf + 1.0)
    } else {
        let n0 = n - n1;
        let b = xf - n1;
        (n0 - b + 1.0) / b * xf / (n - xf + 1.0)
    }
}
