//! verbdrill-oracle — Language-model backends for verbdrill.
//!
//! Implements the `EquivalenceOracle` and `HintWriter` traits for OpenAI and
//! Anthropic, and loads the `verbdrill.toml` configuration that selects one.

pub mod anthropic;
pub mod config;
pub mod error;
mod http;
pub mod mock;
pub mod openai;

pub use config::{attach_backend, load_config, load_config_from, DrillConfig, OracleConfig};
pub use error::OracleError;
