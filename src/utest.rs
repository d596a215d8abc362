use crate::{config::Alternative, math::normal_upper_tail, memo::PValue, transaction::TransactionStore};

/// Mann-Whitney U test with the normal approximation
///
/// Relies on the store being sorted ascending by value: a coverage list of
/// ids is then already in value order, as is the complementary group.
#[derive(Debug)]
pub struct MannWhitneyTest {
    values: Vec<f64>,
    alternative: Alternative,
}
impl MannWhitneyTest {
    pub fn new(store: &TransactionStore, alternative: Alternative) -> Self {
        Self {
            values: store.values(),
            alternative,
        }
    }

    pub fn total(&self) -> usize {
        self.values.len()
    }

    /// p-value of the most extreme split of `x` samples against the rest
    pub fn bound(&self, x: usize) -> f64 {
        let n = self.values.len() as f64;
        let size_x = (x as f64).min(n);
        let size_y = (n - x as f64).max(0.0);
        let mean = size_x * size_y / 2.0;
        let var = size_x * size_y * (size_x + size_y + 1.0) / 12.0;
        if var == 0.0 {
            return 1.0;
        }
        normal_upper_tail(mean / var.sqrt())
    }

    /// Exact p-value of a combination; the statistic is the signed z-score
    pub fn exact_pvalue(&self, coverage: &[usize]) -> PValue {
        debug_assert!(coverage.windows(2).all(|w| w[0] < w[1]));
        let (inside, outside) = self.divide(coverage);
        let (mut p, mut z) = self.u_test(&inside, &outside);
        if self.alternative.is_two_sided() {
            p = (2.0 * p).min(1.0);
        } else {
            if z < 0.0 {
                p = 1.0 - p;
            }
            if self.alternative.is_less() {
                z = -z;
            }
        }
        PValue::new(p, z)
    }

    /// Splits the values into the covered and uncovered groups, both ascending
    fn divide(&self, coverage: &[usize]) -> (Vec<f64>, Vec<f64>) {
        let mut inside = Vec::with_capacity(coverage.len());
        let mut outside = Vec::with_capacity(self.values.len() - coverage.len());
        let mut ids = coverage.iter().peekable();
        for (id, &value) in self.values.iter().enumerate() {
            if ids.next_if_eq(&&id).is_some() {
                inside.push(value);
            } else {
                outside.push(value);
            }
        }
        (inside, outside)
    }

    /// One-sided p-value of `|z|` and the z-score of the U statistic
    fn u_test(&self, inside: &[f64], outside: &[f64]) -> (f64, f64) {
        let u = u_value(inside, outside);
        let size_x = inside.len() as f64;
        let size_y = outside.len() as f64;
        let mean = size_x * size_y / 2.0;
        let var = size_x * size_y * (size_x + size_y + 1.0) / 12.0;
        if var == 0.0 {
            return (1.0, 0.0);
        }
        let z = (u - mean) / var.sqrt();
        (normal_upper_tail(z), z)
    }
}

/// U statistic of `inside` against `outside`, both sorted ascending
///
/// Each inside value scores the number of outside values below it plus half
/// of the outside values tied with it.
pub fn u_value(inside: &[f64], outside: &[f64]) -> f64 {
    let mut u = 0.0;
    let mut left = 0;
    let mut previous: Option<(f64, usize, usize)> = None;
    for &value in inside {
        let (below, not_above) = match previous {
            Some((last, below, not_above)) if last == value => (below, not_above),
            _ => {
                let below = left + outside[left..].partition_point(|&y| y < value);
                let not_above = below + outside[below..].partition_point(|&y| y <= value);
                (below, not_above)
            }
        };
        u += (below + not_above) as f64 / 2.0;
        left = not_above;
        previous = Some((value, below, not_above));
    }
    u
}
