//! Pre-dispatch shaping of raw duplicate findings: the meaningful-duplicate
//! filter, per-file-pair aggregation and language detection. Pure, no I/O.

mod aggregate;
mod error;
mod filter;
mod language;

pub use aggregate::{aggregate, AggregatedFinding, DuplicateSymbol, FilePairKey};
pub use error::{AggregatorError, Result};
pub use filter::{FilterOutcome, FilterReason, FilterSettings, MeaningfulFilter};
pub use language::Language;
