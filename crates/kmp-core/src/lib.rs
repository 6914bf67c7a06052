//! KMP Core: error types and configuration shared by every crate.

pub mod config;
pub mod error;

pub use config::{CollectionConfig, DataPaths, KmpConfig};
pub use error::{Error, Result};
