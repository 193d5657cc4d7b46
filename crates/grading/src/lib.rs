//! Activity Grading (Layer 2)
//!
//! Grade recording with upsert semantics and program-level grade
//! statistics.

#![warn(missing_docs)]

pub mod grader;

pub use grader::{ActivityGrader, BasicActivityGrader};
