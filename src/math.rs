use statrs::function::erf::erfc;

/// Upper tail of the standard normal distribution at `|z|`
///
/// This is the one-sided p-value of a z-score regardless of its sign.
pub fn normal_upper_tail(z: f64) -> f64 {
    0.5 * erfc(z.abs() / std::f64::consts::SQRT_2)
}

/// A 2x2 table of (covered, not covered) x (positive, negative) counts
///
/// ```text
///              positive   negative
/// covered      a          b
/// not covered  c          d
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContingencyTable {
    pub cells: [[f64; 2]; 2],
}
impl ContingencyTable {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            cells: [[a, b], [c, d]],
        }
    }

    /// Table of a combination covering `covered` transactions of which
    /// `covered_positives` are positive, among `total` transactions with
    /// `positives` positives.
    pub fn from_coverage(
        covered: usize,
        covered_positives: usize,
        total: usize,
        positives: usize,
    ) -> Self {
        let a = covered_positives as f64;
        let b = covered as f64 - a;
        let c = positives as f64 - a;
        let d = (total - positives) as f64 - b;
        Self::new(a, b, c, d)
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }

    /// Expected counts under independence of rows and columns
    pub fn expected(&self) -> [[f64; 2]; 2] {
        let total = self.total();
        let rows = [
            self.cells[0][0] + self.cells[0][1],
            self.cells[1][0] + self.cells[1][1],
        ];
        let cols = [
            self.cells[0][0] + self.cells[1][0],
            self.cells[0][1] + self.cells[1][1],
        ];
        let mut means = [[0.0; 2]; 2];
        for (i, row) in rows.iter().enumerate() {
            for (j, col) in cols.iter().enumerate() {
                means[i][j] = row * col / total;
            }
        }
        means
    }

    /// Yates' continuity correction: 0.5 when any expected count is below 5
    pub fn yates_correction(&self) -> f64 {
        if self.expected().iter().flatten().any(|&m| m < 5.0) {
            0.5
        } else {
            0.0
        }
    }

    /// Pearson's chi-square statistic with the given continuity correction
    ///
    /// Cells with zero expectation carry no information and are skipped.
    pub fn chi_square(&self, correction: f64) -> f64 {
        let means = self.expected();
        self.cells
            .iter()
            .flatten()
            .zip(means.iter().flatten())
            .filter(|(_, &mean)| mean > 0.0)
            .map(|(&observed, &mean)| {
                let deviation = (observed - mean).abs() - correction;
                deviation * deviation / mean
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_upper_tail() {
        assert_relative_eq!(normal_upper_tail(0.0), 0.5);
        assert_relative_eq!(normal_upper_tail(1.959963984540054), 0.025, epsilon = 1e-12);
        assert_relative_eq!(normal_upper_tail(-1.959963984540054), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_contingency_from_coverage() {
        let table = ContingencyTable::from_coverage(6, 5, 15, 7);
        assert_eq!(table.cells, [[5.0, 1.0], [2.0, 7.0]]);
        assert_relative_eq!(table.total(), 15.0);
    }

    #[test]
    fn test_expected_counts() {
        let table = ContingencyTable::new(10.0, 20.0, 30.0, 40.0);
        let means = table.expected();
        assert_relative_eq!(means[0][0], 12.0);
        assert_relative_eq!(means[0][1], 18.0);
        assert_relative_eq!(means[1][0], 28.0);
        assert_relative_eq!(means[1][1], 42.0);
        assert_eq!(table.yates_correction(), 0.0);
    }

    #[test]
    fn test_uncorrected_chi_square() {
        let table = ContingencyTable::new(10.0, 20.0, 30.0, 40.0);
        let expected = 4.0 / 12.0 + 4.0 / 18.0 + 4.0 / 28.0 + 4.0 / 42.0;
        assert_relative_eq!(table.chi_square(0.0), expected, epsilon = 1e-12);
    }
}
