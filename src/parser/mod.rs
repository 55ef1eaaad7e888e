//! Result and parameter dump parsing.
//!
//! Both dump kinds share the segmenter and the fixed-column decoder in
//! [`fields`]. Result blocks additionally go through the line classifier,
//! the refund accumulator and the race assembler.

pub mod assembler;
pub mod classifier;
pub mod fields;
pub mod parameters;
pub mod refunds;
pub mod results;

#[cfg(test)]
pub mod tests;

pub use assembler::{applicable_bets, RaceRecordBuilder};
pub use classifier::{classify_block, BlockOutcome, LineClassifier};
pub use parameters::{ParameterOutput, ParameterParser};
pub use refunds::RefundAccumulator;
pub use results::{ResultOutput, ResultParser};
