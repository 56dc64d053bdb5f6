//! Analysis modules.
//!
//! Rollup aggregation over classified records and the summaries
//! derived from it.

pub mod aggregator;
pub mod summary;

pub use aggregator::*;
pub use summary::*;
