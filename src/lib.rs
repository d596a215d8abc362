//! LAMP: Limitless-Arity Multiple-testing Procedure
//!
//! This library finds combinations of binary features (for example sets of
//! transcription factors sharing target genes) whose joint presence is
//! associated with an outcome, while controlling the family-wise error rate
//! exactly. Combinations too rare to ever reach significance are excluded from
//! the correction factor using the minimum attainable p-value of their support.
//!
//! The main components of this library are:
//! - `Lamp`: The procedure itself, generic over a `PatternMiner`
//! - `LampConfig`: Test, alternative hypothesis, significance level and arity limit
//! - `TransactionStore`: The samples with their features and outcome values
//! - `TestEngine`: Fisher's exact test, the chi-square test and the Mann-Whitney U test
//! - `LampResults`: Ranked significant combinations and run metadata
//!
//! ```
//! use lamp::{Lamp, LampConfig, TestKind, TransactionStore};
//!
//! let names = vec!["TF1".to_string(), "TF2".to_string()];
//! let rows = (0..10)
//!     .map(|i| {
//!         let features = if i < 5 { vec![0, 1] } else { vec![1] };
//!         let value = if i < 5 { 1.0 } else { 0.0 };
//!         (format!("gene{i}"), features, value)
//!     })
//!     .collect();
//! let store = TransactionStore::new(names, rows).unwrap();
//!
//! let config = LampConfig::builder().test(TestKind::Fisher).build();
//! let results = Lamp::with_reference_miner(config).run(&store).unwrap();
//! assert_eq!(results.results[0].names, vec!["TF1", "TF2"]);
//! ```

mod chi;
mod config;
mod engine;
mod error;
mod fisher;
mod lamp;
mod math;
mod memo;
mod miner;
mod pattern_cache;
mod results;
mod transaction;
mod utest;
mod utils;

pub use chi::ChiSquareTest;
pub use config::{Alternative, LampConfig, TestKind};
pub use engine::TestEngine;
pub use error::{DataError, LampError, MiningError, Result};
pub use fisher::{point_probability, FisherTest};
pub use lamp::Lamp;
pub use math::{normal_upper_tail, ContingencyTable};
pub use memo::{PValue, PValueMemo};
pub use miner::{ItemsetRecord, PatternMiner, ReferenceMiner};
pub use pattern_cache::{PatternCache, SupportBucket};
pub use results::{EnrichedResult, LampResults, RankedResult, RunMetadata};
pub use transaction::{Transaction, TransactionStore};
pub use utest::{u_value, MannWhitneyTest};
pub use utils::format_g5;
