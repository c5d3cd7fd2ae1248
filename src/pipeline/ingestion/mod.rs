//! Ingestion side of the pipeline: raw upload bytes in, validated tabular
//! data and a content fingerprint out.

pub mod fingerprint;
pub mod mapping;
pub mod reader;
