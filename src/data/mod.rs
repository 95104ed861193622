/// Data layer: raw table, coercion, loading, and the analysis window.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → ColumnTable
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ ColumnTable  │  header + rows of CellValue
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  coerce   │  CellValue → f64 series (NaN for junk, timestamps → s)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  window   │  thrust / time predicates → row Mask (+ margin)
///   └──────────┘
/// ```

pub mod coerce;
pub mod loader;
pub mod model;
pub mod window;
