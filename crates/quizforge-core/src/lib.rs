//! quizforge-core — Quiz authoring, delivery sessions and grading.
//!
//! This crate defines the quiz data model, the pure authoring operations
//! over it, the delivery session state machine with its async timer driver,
//! and the grading engine that scores a submitted attempt.

pub mod authoring;
pub mod config;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod recorder;
pub mod report;
pub mod session;
pub mod shuffle;
pub mod timer;
pub mod traits;
