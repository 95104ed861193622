use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Result, bail};

// ---------------------------------------------------------------------------
// CellValue – a single raw cell of the telemetry table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as delivered by the ingestion layer.
///
/// Numbers stay numbers; everything else is kept as text so the coercion layer
/// can decide (thousands separators, timestamps, junk).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw text field the way a dynamic-typing CSV reader does.
    pub fn guess(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Float(f);
        }
        CellValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// ColumnTable – the complete loaded file
// ---------------------------------------------------------------------------

/// Parsed rows in file order with a unique, ordered header.
///
/// Rows are stored positionally against `columns`, so every row carries
/// exactly the header's column set.
#[derive(Debug, Clone, Default)]
pub struct ColumnTable {
    columns: Vec<String>,
    index: BTreeMap<String, usize>,
    rows: Vec<Vec<CellValue>>,
}

impl ColumnTable {
    /// Build a table from a header and positional records.
    ///
    /// Short records are padded with `Null`; records longer than the header
    /// and duplicate column names are rejected.
    pub fn new(columns: Vec<String>, records: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut index = BTreeMap::new();
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                bail!("Duplicate column name '{name}'");
            }
        }

        let width = columns.len();
        let mut rows = Vec::with_capacity(records.len());
        for (row_no, mut record) in records.into_iter().enumerate() {
            if record.len() > width {
                bail!(
                    "Row {row_no}: {} values but only {width} columns",
                    record.len()
                );
            }
            record.resize(width, CellValue::Null);
            rows.push(record);
        }

        Ok(ColumnTable {
            columns,
            index,
            rows,
        })
    }

    /// Ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` in column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        let col = *self.index.get(name)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// One row as `(column, value)` pairs in header order.
    pub fn row(&self, row: usize) -> Option<impl Iterator<Item = (&str, &CellValue)>> {
        let values = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .map(String::as_str)
                .zip(values.iter()),
        )
    }

    /// All raw cells of a column in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let col = *self.index.get(name)?;
        Some(self.rows.iter().map(|r| &r[col]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn guess_recognises_numbers_and_text() {
        assert_eq!(CellValue::guess("12"), CellValue::Integer(12));
        assert_eq!(CellValue::guess(" 1.5 "), CellValue::Float(1.5));
        assert_eq!(CellValue::guess(""), CellValue::Null);
        assert_eq!(
            CellValue::guess("1,200"),
            CellValue::Text("1,200".to_string())
        );
    }

    #[test]
    fn short_rows_are_padded_with_null() {
        let table = ColumnTable::new(
            header(&["Time", "Thrust"]),
            vec![vec![CellValue::Integer(0)]],
        )
        .unwrap();
        assert_eq!(table.cell(0, "Thrust"), Some(&CellValue::Null));
        let row: Vec<_> = table.row(0).unwrap().collect();
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].0, "Time");
    }

    #[test]
    fn duplicate_columns_and_long_rows_are_rejected() {
        assert!(ColumnTable::new(header(&["a", "a"]), vec![]).is_err());
        assert!(ColumnTable::new(
            header(&["a"]),
            vec![vec![CellValue::Null, CellValue::Null]]
        )
        .is_err());
    }

    #[test]
    fn column_extraction_preserves_order() {
        let table = ColumnTable::new(
            header(&["t"]),
            vec![
                vec![CellValue::Float(0.5)],
                vec![CellValue::Text("x".into())],
            ],
        )
        .unwrap();
        let col = table.column("t").unwrap();
        assert_eq!(col[0], &CellValue::Float(0.5));
        assert_eq!(col[1], &CellValue::Text("x".into()));
        assert!(table.column("missing").is_none());
    }
}
