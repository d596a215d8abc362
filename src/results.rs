use std::{
    io::{self, Write},
    time::Duration,
};

use derive_new::new;
use itertools::Itertools;

use crate::{
    config::{Alternative, TestKind},
    error::Result,
    utils::format_g5,
};

/// A combination that passed the adjusted significance level
#[derive(Debug, Clone, PartialEq, new)]
pub struct EnrichedResult {
    pub items: Vec<usize>,
    pub pvalue: f64,
    pub support: usize,
    /// Positive count for binary tests, z-score for the U-test
    pub statistic: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub rank: usize,
    pub pvalue: f64,
    /// `K * pvalue`
    pub adjusted_pvalue: f64,
    pub items: Vec<usize>,
    pub names: Vec<String>,
    pub support: usize,
    pub statistic: f64,
}
impl RankedResult {
    pub fn arity(&self) -> usize {
        self.items.len()
    }
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    /// `K`, the number of testable combinations at `lambda`
    pub correction_factor: usize,
    /// The minimum support `lambda*` chosen by the search
    pub lambda: usize,
    pub max_lambda: usize,
    pub test: TestKind,
    pub alternative: Alternative,
    pub significance: f64,
    /// `significance / K`
    pub adjusted_significance: f64,
    pub sample_count: usize,
    pub feature_count: usize,
    /// Only defined for binary tests
    pub positive_count: Option<usize>,
    pub arity_limit: Option<usize>,
    /// Number of combinations whose exact p-value was computed
    pub tested: usize,
    pub correction_time: Duration,
    pub testing_time: Duration,
}

/// Ranked significant combinations and the run that produced them
#[derive(Debug, Clone)]
pub struct LampResults {
    pub results: Vec<RankedResult>,
    pub metadata: RunMetadata,
}
impl LampResults {
    /// Ranks the enriched results by ascending p-value
    ///
    /// Ties keep their discovery order.
    pub fn from_vec(
        mut enriched: Vec<EnrichedResult>,
        feature_names: &[String],
        metadata: RunMetadata,
    ) -> Self {
        enriched.sort_by(|a, b| a.pvalue.total_cmp(&b.pvalue));
        let k = metadata.correction_factor as f64;
        let results = enriched
            .into_iter()
            .enumerate()
            .map(|(i, result)| RankedResult {
                rank: i + 1,
                pvalue: result.pvalue,
                adjusted_pvalue: k * result.pvalue,
                names: result
                    .items
                    .iter()
                    .map(|&item| feature_names[item].clone())
                    .collect(),
                items: result.items,
                support: result.support,
                statistic: result.statistic,
            })
            .collect();
        Self { results, metadata }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Writes the tab-separated result stream
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let meta = &self.metadata;
        writeln!(writer, "# LAMP ver. {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(writer, "# significance-level: {}", meta.significance)?;
        writeln!(
            writer,
            "# P-value computing procedure: {} ({})",
            meta.test, meta.alternative
        )?;
        write!(
            writer,
            "# # of tested elements: {}, # of samples: {}",
            meta.feature_count, meta.sample_count
        )?;
        if let Some(positives) = meta.positive_count {
            write!(writer, ", # of positive samples: {positives}")?;
        }
        writeln!(writer)?;
        writeln!(
            writer,
            "# Adjusted significance level: {}, Correction factor: {} (# of target rows >= {})",
            format_g5(meta.adjusted_significance),
            meta.correction_factor,
            meta.lambda
        )?;
        writeln!(writer, "# # of significant combinations: {}", self.len())?;

        if !self.is_empty() {
            writeln!(
                writer,
                "Rank\tRaw p-value\tAdjusted p-value\tCombination\tArity\t# of target rows\t{}",
                meta.test.statistic_label()
            )?;
            for result in &self.results {
                let statistic = if meta.test.is_binary() {
                    format!("{}", result.statistic.round() as i64)
                } else {
                    format_g5(result.statistic)
                };
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    result.rank,
                    format_g5(result.pvalue),
                    format_g5(result.adjusted_pvalue),
                    result.names.iter().join(","),
                    result.arity(),
                    result.support,
                    statistic
                )?;
            }
        }

        let total = meta.correction_time + meta.testing_time;
        writeln!(
            writer,
            "Time (sec.): Computing correction factor {:.3}, Enumerating significant combinations {:.3}, Total {:.3}",
            meta.correction_time.as_secs_f64(),
            meta.testing_time.as_secs_f64(),
            total.as_secs_f64()
        )
    }

    /// Prints the result stream to stdout
    pub fn pprint(&self) -> Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.write_to(&mut handle)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(test: TestKind) -> RunMetadata {
        RunMetadata {
            correction_factor: 4,
            lambda: 3,
            max_lambda: 5,
            test,
            alternative: Alternative::Greater,
            significance: 0.05,
            adjusted_significance: 0.0125,
            sample_count: 15,
            feature_count: 3,
            positive_count: test.is_binary().then_some(7),
            arity_limit: None,
            tested: 6,
            correction_time: Duration::from_millis(1500),
            testing_time: Duration::from_millis(250),
        }
    }

    fn names() -> Vec<String> {
        ["TF1", "TF2", "TF3"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ranking_is_stable_by_pvalue() {
        let enriched = vec![
            EnrichedResult::new(vec![0], 0.003, 5, 5.0),
            EnrichedResult::new(vec![1, 2], 0.001, 4, 4.0),
            EnrichedResult::new(vec![2], 0.003, 6, 5.0),
        ];
        let results = LampResults::from_vec(enriched, &names(), metadata(TestKind::Fisher));
        let order: Vec<_> = results.results.iter().map(|r| r.items.clone()).collect();
        assert_eq!(order, vec![vec![1, 2], vec![0], vec![2]]);
        let ranks: Vec<_> = results.results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        approx::assert_relative_eq!(results.results[0].adjusted_pvalue, 0.004);
        assert_eq!(results.results[0].names, vec!["TF2", "TF3"]);
        assert_eq!(results.results[0].arity(), 2);
    }

    #[test]
    fn test_write_binary_stream() {
        let enriched = vec![EnrichedResult::new(vec![0, 2], 0.00699300699301, 5, 5.0)];
        let results = LampResults::from_vec(enriched, &names(), metadata(TestKind::Fisher));
        let mut buffer = Vec::new();
        results.write_to(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("# LAMP ver. "));
        assert_eq!(lines[1], "# significance-level: 0.05");
        assert_eq!(lines[2], "# P-value computing procedure: fisher (greater)");
        assert_eq!(
            lines[3],
            "# # of tested elements: 3, # of samples: 15, # of positive samples: 7"
        );
        assert_eq!(
            lines[4],
            "# Adjusted significance level: 0.0125, Correction factor: 4 (# of target rows >= 3)"
        );
        assert_eq!(lines[5], "# # of significant combinations: 1");
        assert!(lines[6].ends_with("\t# of positives in the targets"));
        assert_eq!(lines[7], "1\t0.006993\t0.027972\tTF1,TF3\t2\t5\t5");
        assert_eq!(
            lines[8],
            "Time (sec.): Computing correction factor 1.500, Enumerating significant combinations 0.250, Total 1.750"
        );
    }

    #[test]
    fn test_write_u_test_stream() {
        let enriched = vec![EnrichedResult::new(vec![1], 0.009023438818, 5, 2.6111648)];
        let results = LampResults::from_vec(enriched, &names(), metadata(TestKind::MannWhitneyU));
        let mut buffer = Vec::new();
        results.write_to(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("# # of tested elements: 3, # of samples: 15\n"));
        assert!(text.contains("\tz-score\n"));
        assert!(text.contains("1\t0.0090234\t0.036094\tTF2\t1\t5\t2.6112\n"));
    }

    #[test]
    fn test_empty_stream_has_no_table() {
        let results = LampResults::from_vec(vec![], &names(), metadata(TestKind::ChiSquare));
        let mut buffer = Vec::new();
        results.write_to(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("# # of significant combinations: 0\n"));
        assert!(!text.contains("Rank\t"));
        assert!(text.contains("P-value computing procedure: chi (greater)"));
    }
}
