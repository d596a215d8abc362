use std::{borrow::Cow, time::Instant};

use crate::{
    config::{Alternative, LampConfig, TestKind},
    engine::TestEngine,
    error::{DataError, LampError, Result},
    memo::PValue,
    miner::{PatternMiner, ReferenceMiner},
    pattern_cache::PatternCache,
    results::{EnrichedResult, LampResults, RunMetadata},
    transaction::TransactionStore,
};

/// An implementation of the LAMP procedure
///
/// LAMP
/// Limitless-Arity Multiple-testing Procedure
pub struct Lamp<'a, M: PatternMiner + ?Sized> {
    config: LampConfig,
    miner: &'a M,
}
impl Lamp<'static, ReferenceMiner> {
    pub fn with_reference_miner(config: LampConfig) -> Self {
        Self::new(config, &ReferenceMiner)
    }
}
impl<'a, M: PatternMiner + ?Sized> Lamp<'a, M> {
    pub fn new(config: LampConfig, miner: &'a M) -> Self {
        Self { config, miner }
    }

    /// Run the LAMP procedure
    ///
    /// The procedure is a three-step process:
    /// 1. Orient the outcome column and build the test engine
    /// 2. Find the minimum support `lambda*` and the correction factor `K`
    /// 3. Test every combination with support at least `lambda*` against `alpha / K`
    pub fn run(&self, store: &TransactionStore) -> Result<LampResults> {
        self.config.validate()?;
        let start = Instant::now();
        let test = self.config.test;
        let alternative = self.config.alternative;
        let significance = self.config.significance;

        // A "less" run tests "greater" on the reversed outcomes
        let store: Cow<TransactionStore> = if alternative.is_less() {
            let mut reversed = store.clone();
            reversed.reverse_values(test.is_binary());
            Cow::Owned(reversed)
        } else {
            Cow::Borrowed(store)
        };
        let mut engine = TestEngine::new(&store, test, alternative)?;
        let arity_limit = self.config.effective_arity_limit(store.feature_count());
        let max_lambda = max_lambda(&store, &engine)?;
        tracing::info!(
            "computing the optimal correction factor ({test}, {alternative}, max lambda {max_lambda})"
        );

        // Correction factor
        let mut cache = PatternCache::new(self.miner, store.transactions(), max_lambda);
        let mut lambda = self.search(&store, &mut engine, &mut cache, max_lambda, arity_limit)?;
        if lambda > max_lambda {
            tracing::debug!("lambda {lambda} exceeds max lambda, clamped to {max_lambda}");
            lambda = max_lambda;
        }
        cache.ensure(lambda, arity_limit)?;
        let k = cache.total_at_or_above(lambda);
        let adjusted_significance = significance / k as f64;
        let correction_time = start.elapsed();
        tracing::info!("correction factor {k} (# of target rows >= {lambda})");

        // Significance filtering
        let testing_start = Instant::now();
        let reverse_statistic = alternative.is_less() && test.is_binary();
        let mut enriched = Vec::new();
        let mut tested = 0;
        for support in (lambda..=cache.max_support()).rev() {
            for record in cache.itemsets_at(support) {
                tested += 1;
                let PValue { pvalue, statistic } = engine.exact_pvalue(&record.coverage);
                tracing::trace!("testing {:?}: p = {pvalue:.6e}", record.items);
                if pvalue < adjusted_significance {
                    let statistic = if reverse_statistic {
                        record.support() as f64 - statistic
                    } else {
                        statistic
                    };
                    enriched.push(EnrichedResult::new(
                        record.items.clone(),
                        pvalue,
                        record.support(),
                        statistic,
                    ));
                }
            }
        }
        let testing_time = testing_start.elapsed();
        tracing::info!(
            "{} of {tested} testable combinations are significant",
            enriched.len()
        );

        let metadata = RunMetadata {
            correction_factor: k,
            lambda,
            max_lambda,
            test,
            alternative,
            significance,
            adjusted_significance,
            sample_count: engine.sample_count(),
            feature_count: store.feature_count(),
            positive_count: engine.positive_count(),
            arity_limit,
            tested,
            correction_time,
            testing_time,
        };
        Ok(LampResults::from_vec(
            enriched,
            store.feature_names(),
            metadata,
        ))
    }

    /// Finds `lambda*`, preferring a search built into the miner
    fn search(
        &self,
        store: &TransactionStore,
        engine: &mut TestEngine,
        cache: &mut PatternCache<'_, M>,
        max_lambda: usize,
        arity_limit: Option<usize>,
    ) -> Result<usize> {
        if let (Some(n1), Some(n0)) = (engine.positive_count(), engine.negative_count()) {
            let significance =
                bounded_significance(self.config.test, self.config.alternative, n1, n0)
                    * self.config.significance;
            let found = self
                .miner
                .search_threshold(
                    store.transactions(),
                    n1,
                    self.config.test,
                    significance,
                    arity_limit,
                )
                .map_err(|source| LampError::Mining {
                    low_support: 1,
                    arity_limit,
                    source,
                })?;
            if let Some(lambda) = found {
                tracing::debug!("miner search found lambda {lambda}");
                return Ok(lambda);
            }
        }
        self.iterative_search(engine, cache, max_lambda, arity_limit)
    }

    /// Lowers the minimum support from `max_lambda` until Tarone's bracket holds
    fn iterative_search(
        &self,
        engine: &mut TestEngine,
        cache: &mut PatternCache<'_, M>,
        max_lambda: usize,
        arity_limit: Option<usize>,
    ) -> Result<usize> {
        let threshold = if self.config.alternative.is_two_sided() {
            self.config.significance / 2.0
        } else {
            self.config.significance
        };

        let mut lambda = max_lambda;
        while lambda > 1 {
            cache.ensure(lambda, arity_limit)?;
            let m = cache.total_at_or_above(lambda);
            let previous_bound = cache.bound_at(lambda - 1, engine);
            let bound = cache.bound_at(lambda, engine);
            tracing::debug!(
                "lambda {lambda}: m = {m}, f({}) = {previous_bound:.3e}, f({lambda}) = {bound:.3e}",
                lambda - 1
            );
            if tarone_step(lambda, m, previous_bound, bound, threshold)? {
                break;
            }
            lambda -= 1;
        }
        Ok(lambda)
    }
}

/// Whether the search stops at `lambda` with `m` combinations at or above it
///
/// Stops when `floor(threshold / f(lambda - 1)) < m <= floor(threshold / f(lambda))`
/// or when `m` already exceeds the upper end. A bound that grows with the
/// support is a `Masl` error.
fn tarone_step(
    lambda: usize,
    m: usize,
    previous_bound: f64,
    bound: f64,
    threshold: f64,
) -> Result<bool> {
    if bound > previous_bound {
        return Err(LampError::Masl {
            support: lambda,
            bound,
            previous_bound,
        });
    }
    let bottom = count_below(threshold, previous_bound).saturating_add(1);
    let top = count_below(threshold, bound);
    tracing::debug!("{bottom} <= m = {m} <= {top}?");
    Ok((bottom..=top).contains(&m) || top < m)
}

/// `floor(threshold / bound)`, unbounded for a zero bound
fn count_below(threshold: f64, bound: f64) -> usize {
    if bound == 0.0 {
        usize::MAX
    } else {
        (threshold / bound).floor() as usize
    }
}

/// Fraction of alpha handed to a miner-side search
///
/// The chi-square search always halves alpha for a two-sided test, the
/// Fisher search only when both classes have the same size.
fn bounded_significance(test: TestKind, alternative: Alternative, n1: usize, n0: usize) -> f64 {
    let halve = alternative.is_two_sided()
        && match test {
            TestKind::ChiSquare => true,
            TestKind::Fisher => n1 == n0,
            TestKind::MannWhitneyU => false,
        };
    if halve {
        0.5
    } else {
        1.0
    }
}

/// Highest support worth testing
///
/// Binary tests are additionally capped by the size of the smaller class.
fn max_lambda(store: &TransactionStore, engine: &TestEngine) -> std::result::Result<usize, DataError> {
    let mut max_lambda = store.max_lambda();
    if let (Some(n1), Some(n0)) = (engine.positive_count(), engine.negative_count()) {
        max_lambda = max_lambda.min(n1.min(n0));
    }
    if max_lambda == 0 {
        return Err(DataError::NoTestableFeatures);
    }
    Ok(max_lambda)
}
