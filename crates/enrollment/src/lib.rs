//! Enrollment Lifecycle (Layer 4)
//!
//! Enrollment state, aggregated progress application, and idempotent
//! certificate issuance.

#![warn(missing_docs)]

pub mod lifecycle;

pub use lifecycle::{BasicEnrollmentLifecycle, EnrollmentLifecycle};
