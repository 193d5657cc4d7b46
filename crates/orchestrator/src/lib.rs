//! Program Orchestration (Layer 5)
//!
//! The façade external callers use. Sequences interaction tracking,
//! progress aggregation, and enrollment updates inside one storage
//! transaction so aggregates never drift from committed interactions.

#![warn(missing_docs)]

pub mod facade;

pub use facade::ProgramOrchestrator;
