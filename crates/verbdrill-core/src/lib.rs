//! verbdrill-core — Grading, verb selection, and progress statistics.
//!
//! This crate defines the data model, the answer normalizer and grader,
//! the adaptive verb selector, progress aggregation, and the record store
//! that the rest of verbdrill builds on.

pub mod engine;
pub mod error;
pub mod grading;
pub mod hint;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod selector;
pub mod statistics;
pub mod store;
pub mod traits;
