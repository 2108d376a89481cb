//! Header-to-field column mapping.
//!
//! The map is built once per run from the header row and read by every
//! data row. To-many fields may repeat their header name; each occurrence
//! contributes one column to the field's index list.

use std::collections::HashMap;

/// One CSV row: an ordered list of string cells.
///
/// Reads past the end of the row yield the empty string, matching short
/// rows in ragged files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRow {
    cells: Vec<String>,
}

impl ImportRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn from_record(record: &csv::StringRecord) -> Self {
        Self {
            cells: record.iter().map(|cell| cell.to_string()).collect(),
        }
    }

    /// Cell at `index`, or the empty string when the row is shorter.
    pub fn get(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(String::as_str)
    }
}

/// Where a field's values live in a row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnIndex {
    /// Scalar and to-one fields map to a single column.
    One(usize),
    /// To-many fields map to every column repeating their header.
    Many(Vec<usize>),
}

/// Mapping from field name to column position(s), immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    entries: HashMap<String, ColumnIndex>,
}

impl ColumnMap {
    /// Build the map from the header row.
    ///
    /// Blank header cells are skipped, never mapped. A duplicate header for
    /// a non-to-many field silently overwrites the earlier mapping
    /// (last-write-wins, preserved deliberately).
    pub fn build(header: &ImportRow, to_many_fields: &[String]) -> Self {
        let mut entries: HashMap<String, ColumnIndex> = HashMap::new();

        for (i, cell) in header.iter().enumerate() {
            let name = cell.trim();
            if name.is_empty() {
                continue;
            }

            if to_many_fields.iter().any(|f| f == name) {
                let entry = entries
                    .entry(name.to_string())
                    .or_insert_with(|| ColumnIndex::Many(Vec::new()));
                if let ColumnIndex::Many(indices) = entry {
                    indices.push(i);
                }
            } else {
                entries.insert(name.to_string(), ColumnIndex::One(i));
            }
        }

        Self { entries }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Single column index of a scalar or to-one field.
    pub fn single(&self, field: &str) -> Option<usize> {
        match self.entries.get(field) {
            Some(ColumnIndex::One(i)) => Some(*i),
            _ => None,
        }
    }

    /// All column indices of a to-many field; empty when unmapped.
    pub fn many(&self, field: &str) -> &[usize] {
        match self.entries.get(field) {
            Some(ColumnIndex::Many(indices)) => indices,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> ImportRow {
        ImportRow::new(cells.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_scalar_and_to_one_mapping() {
        let map = ColumnMap::build(&header(&["name", "price", "category"]), &[]);
        assert_eq!(map.single("name"), Some(0));
        assert_eq!(map.single("price"), Some(1));
        assert_eq!(map.single("category"), Some(2));
        assert!(!map.contains("missing"));
    }

    #[test]
    fn test_repeated_to_many_headers() {
        let map = ColumnMap::build(
            &header(&["name", "tag", "tag", "tag"]),
            &["tag".to_string()],
        );
        assert_eq!(map.single("name"), Some(0));
        assert_eq!(map.many("tag"), &[1, 2, 3]);
        assert_eq!(map.single("tag"), None);
    }

    #[test]
    fn test_single_to_many_column() {
        let map = ColumnMap::build(&header(&["name", "tag"]), &["tag".to_string()]);
        assert_eq!(map.many("tag"), &[1]);
    }

    #[test]
    fn test_blank_headers_skipped() {
        let map = ColumnMap::build(&header(&["name", "", "  ", "price"]), &[]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.single("price"), Some(3));
    }

    #[test]
    fn test_duplicate_scalar_header_last_wins() {
        let map = ColumnMap::build(&header(&["name", "price", "name"]), &[]);
        assert_eq!(map.single("name"), Some(2));
    }

    #[test]
    fn test_row_out_of_range_reads_empty() {
        let row = ImportRow::new(vec!["a".into()]);
        assert_eq!(row.get(0), "a");
        assert_eq!(row.get(5), "");
    }
}
