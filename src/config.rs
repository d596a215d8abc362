use std::{fmt, str::FromStr};

use bon::Builder;

use crate::error::DataError;

/// The statistical test used to score a combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    Fisher,
    ChiSquare,
    MannWhitneyU,
}
impl TestKind {
    /// Binary tests require every outcome value to be 0 or 1
    pub fn is_binary(&self) -> bool {
        matches!(self, TestKind::Fisher | TestKind::ChiSquare)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TestKind::Fisher => "fisher",
            TestKind::ChiSquare => "chi",
            TestKind::MannWhitneyU => "u_test",
        }
    }

    /// Header of the statistic column in the result stream
    pub fn statistic_label(&self) -> &'static str {
        match self {
            TestKind::MannWhitneyU => "z-score",
            _ => "# of positives in the targets",
        }
    }
}
impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fisher" => Ok(TestKind::Fisher),
            "chi" => Ok(TestKind::ChiSquare),
            "u_test" => Ok(TestKind::MannWhitneyU),
            _ => Err(format!(
                "unknown test \"{s}\": choose \"fisher\", \"chi\" or \"u_test\""
            )),
        }
    }
}

/// Alternative hypothesis of the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alternative {
    #[default]
    Greater,
    TwoSided,
    Less,
}
impl Alternative {
    pub fn is_two_sided(&self) -> bool {
        matches!(self, Alternative::TwoSided)
    }

    pub fn is_less(&self) -> bool {
        matches!(self, Alternative::Less)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Alternative::Greater => "greater",
            Alternative::TwoSided => "two.sided",
            Alternative::Less => "less",
        }
    }
}
impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
impl FromStr for Alternative {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater" => Ok(Alternative::Greater),
            "two.sided" | "two_sided" => Ok(Alternative::TwoSided),
            "less" => Ok(Alternative::Less),
            _ => Err(format!(
                "unknown alternative \"{s}\": choose \"greater\", \"less\" or \"two.sided\""
            )),
        }
    }
}

/// Parameters of a single LAMP run
///
/// ```
/// use lamp::{LampConfig, TestKind};
///
/// let config = LampConfig::builder().test(TestKind::Fisher).build();
/// assert_eq!(config.significance, 0.05);
/// assert!(config.arity_limit.is_none());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct LampConfig {
    /// Family-wise significance level (alpha)
    #[builder(default = 0.05)]
    pub significance: f64,

    pub test: TestKind,

    #[builder(default)]
    pub alternative: Alternative,

    /// Largest combination size to test, `None` for no limit
    pub arity_limit: Option<usize>,
}
impl LampConfig {
    pub fn validate(&self) -> Result<(), DataError> {
        if !(0.0..=1.0).contains(&self.significance) {
            return Err(DataError::InvalidSignificance(self.significance));
        }
        Ok(())
    }

    /// The arity limit actually applied for `n_features` columns
    ///
    /// A limit that is at least the number of features cannot exclude any
    /// combination and is treated as no limit.
    pub fn effective_arity_limit(&self, n_features: usize) -> Option<usize> {
        self.arity_limit.filter(|&limit| limit < n_features)
    }
}
