//! Storage abstraction and implementations for Pathway.
//!
//! This crate provides the trait-based persistence interface the
//! progression engine requires from its host, an in-memory backend with
//! snapshot transactions, and a JSON-file reference backend.

#![warn(missing_docs)]

pub mod trait_;

pub mod json_storage;
pub mod memory;

pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
pub use trait_::{Result, Storage, StorageError};
