use thiserror::Error;

use crate::config::TestKind;

/// Problems with the input data or the run parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("\"{name}\" value is {value}, but {test} requires every value to be 1 or 0")]
    NonBinaryValue {
        name: String,
        value: f64,
        test: TestKind,
    },

    #[error("there are no positive samples")]
    NoPositives,

    #[error("the transaction set is empty")]
    NoTransactions,

    #[error("feature index {feature} of \"{name}\" is out of range ({features} features)")]
    UnknownFeature {
        name: String,
        feature: usize,
        features: usize,
    },

    #[error("significance level must be a value from 0.0 to 1.0, got {0}")]
    InvalidSignificance(f64),

    #[error("no feature is present in any transaction")]
    NoTestableFeatures,
}

/// Failure reported by a pattern miner
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct MiningError {
    pub message: String,
}
impl MiningError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that abort a LAMP run
#[derive(Error, Debug)]
pub enum LampError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("MASL error: f({support}) = {bound:.3e} is larger than f({}) = {previous_bound:.3e}", .support - 1)]
    Masl {
        support: usize,
        bound: f64,
        previous_bound: f64,
    },

    #[error("mining error at minimum support {low_support} (arity limit {arity_limit:?}): {source}")]
    Mining {
        low_support: usize,
        arity_limit: Option<usize>,
        #[source]
        source: MiningError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for LAMP operations
pub type Result<T> = std::result::Result<T, LampError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masl_message_names_both_supports() {
        let err = LampError::Masl {
            support: 4,
            bound: 0.5,
            previous_bound: 0.25,
        };
        let message = err.to_string();
        assert!(message.contains("f(4)"));
        assert!(message.contains("f(3)"));
    }

    #[test]
    fn test_data_error_converts() {
        let err: LampError = DataError::NoPositives.into();
        assert!(matches!(err, LampError::Data(DataError::NoPositives)));
    }
}
