//! Processing side of the pipeline: typed records out of raw rows, per-item
//! series out of records, forecasts out of series.

pub mod aggregate;
pub mod forecast;
pub mod normalize;
