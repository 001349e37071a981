//! Tabular metadata loading
//!
//! A table is either fully loaded or absent. Any read or parse failure
//! collapses the whole table to `Absent`; rows are never partially kept.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::errors::{DetectionError, Result};
use crate::types::ClassIndex;

/// One loaded-or-absent metadata table keyed by class index
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataTable<T> {
    Loaded(Vec<T>),
    Absent { reason: String },
}

impl<T> MetadataTable<T> {
    pub fn absent(reason: impl Into<String>) -> Self {
        MetadataTable::Absent {
            reason: reason.into(),
        }
    }

    /// Bounds-checked row lookup; out of range and absent tables give `None`
    pub fn lookup(&self, index: ClassIndex) -> Option<&T> {
        match self {
            MetadataTable::Loaded(rows) => rows.get(index),
            MetadataTable::Absent { .. } => None,
        }
    }

    /// Row count of a loaded table
    pub fn len(&self) -> Option<usize> {
        match self {
            MetadataTable::Loaded(rows) => Some(rows.len()),
            MetadataTable::Absent { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, MetadataTable::Loaded(_))
    }
}

impl<T: DeserializeOwned> MetadataTable<T> {
    /// Load a CSV file, turning any failure into an absent table
    pub fn load(path: &Path) -> Self {
        match read_csv(path) {
            Ok(rows) => {
                tracing::info!(path = %path.display(), rows = rows.len(), "metadata table loaded");
                MetadataTable::Loaded(rows)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "metadata table unavailable");
                MetadataTable::absent(e.to_string())
            }
        }
    }
}

/// Parse every row of a headered CSV file
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = std::fs::read(path).map_err(|e| {
        DetectionError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_csv(&decode_text(bytes))
        .map_err(|e| DetectionError::ConfigError(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Parse headered CSV text into rows
pub fn parse_csv<T: DeserializeOwned>(text: &str) -> std::result::Result<Vec<T>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes())
        .deserialize()
        .collect()
}

/// Windows-1252 code points for bytes 0x80..=0x9F. Bytes left undefined
/// by the code page map to the matching C1 control.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{81}', '\u{201A}', '\u{192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2C6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8D}', '\u{17D}', '\u{8F}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2DC}', '\u{2122}', '\u{161}', '\u{203A}', '\u{153}', '\u{9D}', '\u{17E}', '\u{178}',
];

fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// UTF-8 when valid, otherwise Windows-1252 (spreadsheet exports)
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(cp1252_char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        name: String,
    }

    #[test]
    fn test_lookup_bounds() {
        let table = MetadataTable::Loaded(vec![Row { name: "a".into() }]);
        assert!(table.lookup(0).is_some());
        assert!(table.lookup(1).is_none());
        assert!(table.lookup(2).is_none());
        assert_eq!(table.len(), Some(1));
    }

    #[test]
    fn test_absent_lookup() {
        let table: MetadataTable<Row> = MetadataTable::absent("missing");
        assert!(table.lookup(0).is_none());
        assert_eq!(table.len(), None);
        assert!(!table.is_loaded());
    }

    #[test]
    fn test_missing_file_is_absent() {
        let table: MetadataTable<Row> = MetadataTable::load(Path::new("/nonexistent/rows.csv"));
        assert!(!table.is_loaded());
    }

    #[test]
    fn test_malformed_file_is_absent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "other").unwrap();
        writeln!(file, "x").unwrap();

        let table: MetadataTable<Row> = MetadataTable::load(file.path());
        assert!(!table.is_loaded());
    }

    #[test]
    fn test_cp1252_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"name\ncaf\xe9\n").unwrap();

        let table: MetadataTable<Row> = MetadataTable::load(file.path());
        assert_eq!(table.lookup(0).unwrap().name, "caf\u{e9}");
    }

    #[test]
    fn test_cp1252_punctuation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"name\nplant\x92s leaf \x96 spots\x85\n").unwrap();

        let table: MetadataTable<Row> = MetadataTable::load(file.path());
        assert_eq!(
            table.lookup(0).unwrap().name,
            "plant\u{2019}s leaf \u{2013} spots\u{2026}"
        );
    }

    #[test]
    fn test_utf8_kept_as_is() {
        assert_eq!(decode_text("leaf \u{2013} spot".as_bytes().to_vec()), "leaf \u{2013} spot");
        assert_eq!(decode_text(vec![0x80, 0x81, 0x9F, 0x41]), "\u{20AC}\u{81}\u{178}A");
    }
}
