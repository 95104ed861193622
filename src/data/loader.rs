use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, ColumnTable};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a telemetry table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – header row, one sample per line (recommended)
/// * `.json`         – `[{ "Time (s)": 0.0, "Thrust (lbf)": 12.5, ... }, ...]`
/// * `.parquet`      – flat table with scalar columns
pub fn load_file(path: &Path) -> Result<ColumnTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<ColumnTable> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    read_csv(file)
}

/// Parse CSV text with a header row.
///
/// Cells are typed dynamically (integer, float, text, empty → null); lines
/// with no content are skipped and short records are padded.
pub fn read_csv<R: Read>(input: R) -> Result<ColumnTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        bail!("CSV has no header row");
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(CellValue::guess).collect());
    }

    ColumnTable::new(headers, records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Time (s)": 0.00, "Thrust (lbf)": 0.4, "Fuel Weight (lbs)": 20.1 },
///   { "Time (s)": 0.01, "Thrust (lbf)": 0.6, "Fuel Weight (lbs)": 20.1 }
/// ]
/// ```
///
/// Column order follows first appearance across the records.
fn load_json(path: &Path) -> Result<ColumnTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    read_json(&text)
}

pub fn read_json(text: &str) -> Result<ColumnTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .into_iter()
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    ColumnTable::new(columns, rows)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Integer(i64::from(*b)),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table; every column becomes a table column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<ColumnTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for batch_result in reader {
        let offset = rows.len();
        let batch = batch_result.context("reading parquet record batch")?;
        let arrays = batch.columns();

        for row in 0..batch.num_rows() {
            rows.push(
                arrays
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("Row {}", offset + row))?,
            );
        }
    }

    ColumnTable::new(columns, rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            CellValue::Text(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            CellValue::Integer(i64::from(arr.value(row)))
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            CellValue::Float(f64::from(arr.value(row)))
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            CellValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            CellValue::Integer(i64::from(arr.value(row)))
        }
        other => bail!("Unsupported parquet column type {other:?}"),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn csv_is_typed_and_blank_lines_skipped() {
        let text = "Time (s),Thrust (lbf),Note\n0.0,1.5,ok\n\n0.1,\"1,200\",\n";
        let table = read_csv(text.as_bytes()).unwrap();
        assert_eq!(table.columns(), ["Time (s)", "Thrust (lbf)", "Note"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "Thrust (lbf)"), Some(&CellValue::Float(1.5)));
        assert_eq!(
            table.cell(1, "Thrust (lbf)"),
            Some(&CellValue::Text("1,200".to_string()))
        );
        assert_eq!(table.cell(1, "Note"), Some(&CellValue::Null));
    }

    #[test]
    fn json_records_union_their_keys() {
        let table = read_json(r#"[{"t": 0, "a": 1.5}, {"t": 1, "b": "x"}]"#).unwrap();
        assert_eq!(table.columns(), ["t", "a", "b"]);
        assert_eq!(table.cell(1, "a"), Some(&CellValue::Null));
        assert_eq!(table.cell(1, "b"), Some(&CellValue::Text("x".into())));
    }

    #[test]
    fn json_columns_keep_file_order() {
        let table = read_json(
            r#"[{"Time (s)": 0.0, "Thrust (lbf)": 1.0, "Chamber Pressure (psi)": 2.0}]"#,
        )
        .unwrap();
        assert_eq!(
            table.columns(),
            ["Time (s)", "Thrust (lbf)", "Chamber Pressure (psi)"]
        );
    }

    #[test]
    fn json_must_be_an_array() {
        assert!(read_json(r#"{"t": 1}"#).is_err());
    }

    #[test]
    fn parquet_rows_keep_order_across_row_groups() {
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![Field::new("Time (s)", DataType::Float64, false)]));
        let batch = |values: Vec<f64>| {
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Float64Array::from(values))]).unwrap()
        };
        let file = Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer =
            ArrowWriter::try_new(std::fs::File::create(file.path()).unwrap(), schema.clone(), None)
                .unwrap();
        writer.write(&batch(vec![0.0, 0.1, 0.2])).unwrap();
        writer.flush().unwrap();
        writer.write(&batch(vec![0.3, 0.4])).unwrap();
        writer.close().unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.columns(), ["Time (s)"]);
        assert_eq!(table.len(), 5);
        assert_eq!(table.cell(4, "Time (s)"), Some(&CellValue::Float(0.4)));
    }

    #[test]
    fn load_file_dispatches_on_extension() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"time,thrust\n0,10\n1,12\n").unwrap();
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);

        let other = Builder::new().suffix(".xyz").tempfile().unwrap();
        assert!(load_file(other.path()).is_err());
    }
}
