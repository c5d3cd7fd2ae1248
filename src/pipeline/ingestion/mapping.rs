use crate::domain::ColumnMapping;
use crate::error::{PipelineError, Result};

/// A mapping validated against an actual header row, with the declared
/// columns resolved to their positions in each record.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMapping {
    pub date_idx: usize,
    pub item_idx: usize,
    pub quantity_idx: usize,
}

/// Validates a declared mapping against the header row.
///
/// Every absent column is reported, not just the first, in declaration
/// order (date, item, quantity). Matching is exact and case-sensitive.
pub fn resolve_mapping(mapping: &ColumnMapping, headers: &[String]) -> Result<ResolvedMapping> {
    let find = |name: &str| headers.iter().position(|h| h == name);

    let mut missing = Vec::new();
    for name in mapping.columns() {
        if name.is_empty() || find(name).is_none() {
            missing.push(name.to_string());
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    Ok(ResolvedMapping {
        date_idx: find(&mapping.date_column).unwrap(),
        item_idx: find(&mapping.item_column).unwrap(),
        quantity_idx: find(&mapping.quantity_column).unwrap(),
    })
}
