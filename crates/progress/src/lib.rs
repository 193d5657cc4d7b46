//! Progress Aggregation (Layer 3)
//!
//! Derives a learner's completion percentage for a program from the
//! required content items and their latest interactions.

#![warn(missing_docs)]

pub mod aggregator;

pub use aggregator::{BasicProgressAggregator, ProgressAggregator};
