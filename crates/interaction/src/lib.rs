//! Content Interaction Tracking (Layer 1)
//!
//! Lifecycle of a learner's attempt at one content item: start/resume,
//! progress updates, submission, completion, and time accounting.

#![warn(missing_docs)]

pub mod tracker;

pub use tracker::{BasicInteractionTracker, InteractionTracker};
