//! pathwise-store — Progress persistence and configuration.
//!
//! Implements the `ProgressStore` trait with a JSON-file store and an
//! in-memory store, and loads the `pathwise.toml` configuration.

pub mod config;
pub mod error;
pub mod json_store;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, PathwiseConfig, StoreConfig};
pub use error::StoreError;
pub use json_store::JsonFileStore;
pub use memory::MemoryStore;
