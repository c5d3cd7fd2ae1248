use crate::error::{PipelineError, Result};
use csv::StringRecord;

/// A decoded CSV upload: the header row plus every data record, still raw
/// strings. Produced once per request and consumed by the normalizer.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

/// Decodes a raw upload buffer into a CSV table.
///
/// The buffer must be UTF-8 (a leading BOM is tolerated and stripped, it is
/// a fingerprint-relevant byte but not a content-relevant one). The first
/// row is the header. Ragged rows are allowed through here; the normalizer
/// decides per-row whether a record is usable.
pub fn read_table(raw: &[u8]) -> Result<CsvTable> {
    if raw.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let text = std::str::from_utf8(raw).map_err(|_| PipelineError::NotUtf8)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|_| PipelineError::MissingHeader)?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::MissingHeader);
    }

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }

    Ok(CsvTable { headers, records })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_records() {
        let table = read_table(b"Date,Item,Quantity\n2024-01-01,Widget,3\n").unwrap();
        assert_eq!(table.headers, vec!["Date", "Item", "Quantity"]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(&table.records[0][1], "Widget");
    }

    #[test]
    fn strips_utf8_bom_before_the_header() {
        let table = read_table("\u{feff}Date,Item,Quantity\n".as_bytes()).unwrap();
        assert_eq!(table.headers[0], "Date");
    }

    #[test]
    fn empty_buffer_is_rejected() {
        assert!(matches!(read_table(b""), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn non_utf8_buffer_is_rejected() {
        assert!(matches!(
            read_table(&[0xff, 0xfe, 0x00]),
            Err(PipelineError::NotUtf8)
        ));
    }

    #[test]
    fn ragged_rows_are_passed_through() {
        let table = read_table(b"Date,Item,Quantity\n2024-01-01,Widget\n").unwrap();
        assert_eq!(table.records.len(), 1);
    }
}
