use crate::{
    chi::ChiSquareTest,
    config::{Alternative, TestKind},
    error::DataError,
    fisher::FisherTest,
    memo::PValue,
    transaction::TransactionStore,
    utest::MannWhitneyTest,
};

/// The statistical test of a run
///
/// Supplies the bound function (minimum attainable p-value per support) used
/// by the threshold search and the exact p-value used for filtering.
#[derive(Debug)]
pub enum TestEngine {
    Fisher(FisherTest),
    ChiSquare(ChiSquareTest),
    MannWhitneyU(MannWhitneyTest),
}
impl TestEngine {
    /// Builds the engine for `kind` over an already oriented store
    ///
    /// For a "less" run the store must have been reversed beforehand, the
    /// binary engines then test "greater".
    pub fn new(
        store: &TransactionStore,
        kind: TestKind,
        alternative: Alternative,
    ) -> Result<Self, DataError> {
        let engine = match kind {
            TestKind::Fisher => TestEngine::Fisher(FisherTest::new(store, alternative)?),
            TestKind::ChiSquare => TestEngine::ChiSquare(ChiSquareTest::new(store, alternative)?),
            TestKind::MannWhitneyU => {
                TestEngine::MannWhitneyU(MannWhitneyTest::new(store, alternative))
            }
        };
        Ok(engine)
    }

    pub fn kind(&self) -> TestKind {
        match self {
            TestEngine::Fisher(_) => TestKind::Fisher,
            TestEngine::ChiSquare(_) => TestKind::ChiSquare,
            TestEngine::MannWhitneyU(_) => TestKind::MannWhitneyU,
        }
    }

    /// Minimum attainable p-value of any combination covering exactly `x` transactions
    pub fn bound(&mut self, x: usize) -> f64 {
        match self {
            TestEngine::Fisher(test) => test.bound(x),
            TestEngine::ChiSquare(test) => test.bound(x),
            TestEngine::MannWhitneyU(test) => test.bound(x),
        }
    }

    /// Exact p-value and statistic of the combination covering `coverage`
    pub fn exact_pvalue(&mut self, coverage: &[usize]) -> PValue {
        match self {
            TestEngine::Fisher(test) => test.exact_pvalue(coverage),
            TestEngine::ChiSquare(test) => test.exact_pvalue(coverage),
            TestEngine::MannWhitneyU(test) => test.exact_pvalue(coverage),
        }
    }

    /// Number of positive samples, defined for binary tests only
    pub fn positive_count(&self) -> Option<usize> {
        match self {
            TestEngine::Fisher(test) => Some(test.positives()),
            TestEngine::ChiSquare(test) => Some(test.positives()),
            TestEngine::MannWhitneyU(_) => None,
        }
    }

    pub fn sample_count(&self) -> usize {
        match self {
            TestEngine::Fisher(test) => test.total(),
            TestEngine::ChiSquare(test) => test.total(),
            TestEngine::MannWhitneyU(test) => test.total(),
        }
    }

    /// Number of negative samples, defined for binary tests only
    pub fn negative_count(&self) -> Option<usize> {
        self.positive_count().map(|n1| self.sample_count() - n1)
    }
}

/// Positive flags of a binary outcome column, indexed by transaction id
///
/// Fails when a value is neither 0 nor 1, or when there is no positive.
pub(crate) fn binary_positives(
    store: &TransactionStore,
    test: TestKind,
) -> Result<Vec<bool>, DataError> {
    let mut flags = Vec::with_capacity(store.len());
    for t in store.transactions() {
        if t.value == 1.0 {
            flags.push(true);
        } else if t.value == 0.0 {
            flags.push(false);
        } else {
            return Err(DataError::NonBinaryValue {
                name: t.name.clone(),
                value: t.value,
                test,
            });
        }
    }
    if !flags.contains(&true) {
        return Err(DataError::NoPositives);
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(values: &[f64]) -> TransactionStore {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (format!("g{i}"), vec![0], v))
            .collect();
        TransactionStore::new(vec!["TF1".to_string()], rows).unwrap()
    }

    #[test]
    fn test_engine_summaries() {
        let store = store(&[1.0, 0.0, 1.0, 0.0, 0.0]);
        let engine = TestEngine::new(&store, TestKind::ChiSquare, Alternative::Greater).unwrap();
        assert_eq!(engine.kind(), TestKind::ChiSquare);
        assert_eq!(engine.positive_count(), Some(2));
        assert_eq!(engine.negative_count(), Some(3));
        assert_eq!(engine.sample_count(), 5);

        let engine = TestEngine::new(&store, TestKind::MannWhitneyU, Alternative::Greater).unwrap();
        assert_eq!(engine.positive_count(), None);
        assert_eq!(engine.sample_count(), 5);
    }

    #[test]
    fn test_binary_tests_reject_continuous_values() {
        let store = store(&[1.0, 0.0, 2.0]);
        for kind in [TestKind::Fisher, TestKind::ChiSquare] {
            let err = TestEngine::new(&store, kind, Alternative::Greater).unwrap_err();
            assert!(matches!(err, DataError::NonBinaryValue { test, .. } if test == kind));
        }
        assert!(TestEngine::new(&store, TestKind::MannWhitneyU, Alternative::Greater).is_ok());
    }

    #[test]
    fn test_bound_dispatch() {
        let store = store(&[1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        let mut engine = TestEngine::new(&store, TestKind::Fisher, Alternative::Greater).unwrap();
        // C(3,3) / C(6,3)
        approx::assert_relative_eq!(engine.bound(3), 1.0 / 20.0, epsilon = 1e-15);
        let result = engine.exact_pvalue(&[3, 4, 5]);
        approx::assert_relative_eq!(result.pvalue, 1.0 / 20.0, epsilon = 1e-15);
        assert_eq!(result.statistic, 3.0);
    }
}
