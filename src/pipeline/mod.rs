//! The ingestion-normalization-and-forecast pipeline.
//!
//! Pure and synchronous end to end: raw bytes + mapping go in, a structured
//! forecast comes out. The stages own no shared state; persistence and the
//! remote predictor live behind the application ports.

pub mod ingestion;
pub mod processing;
