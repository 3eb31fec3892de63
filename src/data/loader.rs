use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{ColumnType, Scalar, Table};
use crate::error::{Result, SplitError};

/// Cell texts treated as missing when reading delimited text.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_MARKERS: &[&str] = &["True", "TRUE", "true"];
const FALSE_MARKERS: &[&str] = &["False", "FALSE", "false"];

/// Knobs for reading delimited text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Field separator for `.csv`, `.txt` and extension-less files.
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { delimiter: b',' }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` / none – delimited text with a header row
/// * `.tsv`                 – tab-delimited text with a header row
/// * `.json`                – `[{ "col": value, ... }, ...]`
/// * `.parquet` / `.pq`     – flat Parquet file with scalar columns
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" | "txt" | "" => load_delimited(path, options.delimiter)?,
        "tsv" => load_delimited(path, b'\t')?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => {
            return Err(SplitError::UnsupportedFormat {
                extension: other.to_string(),
            })
        }
    };

    debug!(
        "loaded {}: {} rows, columns [{}]",
        path.display(),
        table.len(),
        table
            .column_names
            .iter()
            .zip(&table.column_types)
            .map(|(name, ty)| format!("{name}: {ty}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(table)
}

/// Parse delimited text with a header row from any reader.
pub fn read_delimited<R: io::Read>(reader: R, options: &LoadOptions) -> Result<Table> {
    parse_delimited(reader, options.delimiter, Path::new("<reader>"))
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| SplitError::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let file = open(path)?;
    parse_delimited(file, delimiter, path)
}

fn parse_delimited<R: io::Read>(reader: R, delimiter: u8, path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        return Err(SplitError::parse(path, "no columns to parse from file"));
    }
    let column_names = dedup_names(headers);
    let n_columns = column_names.len();

    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); n_columns];
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        for (col, field) in raw_columns.iter_mut().zip(record.iter()) {
            col.push(field.to_string());
        }
    }

    let columns = raw_columns
        .into_iter()
        .map(|raw| {
            let guessed = raw.iter().map(|s| guess_scalar(s)).collect();
            let (ty, cells) = unify_column(guessed);
            if ty == ColumnType::Text {
                // Text columns keep the original spelling of every cell.
                let cells = raw
                    .into_iter()
                    .map(|s| {
                        if is_missing(&s) {
                            Scalar::Null
                        } else {
                            Scalar::Text(s)
                        }
                    })
                    .collect();
                (ty, cells)
            } else {
                (ty, cells)
            }
        })
        .collect();

    Ok(table_from_columns(column_names, columns))
}

/// I/O failures while streaming keep their access-error meaning; the rest is content.
fn csv_error(path: &Path, err: csv::Error) -> SplitError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => SplitError::FileAccess {
            path: path.to_path_buf(),
            source,
        },
        _ => SplitError::parse(path, message),
    }
}

fn is_missing(s: &str) -> bool {
    MISSING_MARKERS.contains(&s)
}

fn guess_scalar(s: &str) -> Scalar {
    if is_missing(s) {
        return Scalar::Null;
    }
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Scalar::Integer(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Scalar::Float(f);
    }
    if TRUE_MARKERS.contains(&trimmed) {
        return Scalar::Bool(true);
    }
    if FALSE_MARKERS.contains(&trimmed) {
        return Scalar::Bool(false);
    }
    Scalar::Text(s.to_string())
}

/// Suffix repeated header names: `a, a, a` → `a, a.1, a.2`.
fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(names.len());
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let mut candidate = name.clone();
        while used.contains(&candidate) {
            let n = next_suffix.entry(name.clone()).or_insert(1);
            candidate = format!("{name}.{n}");
            *n += 1;
        }
        used.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

// ---------------------------------------------------------------------------
// Column typing
// ---------------------------------------------------------------------------

/// Settle on one dtype for a column of individually guessed cells.
///
/// * every cell an integer                  → `Integer`
/// * every non-null cell a number           → `Float` (nulls become NaN)
/// * every cell a bool                      → `Bool`
/// * anything else                          → `Text`, cells kept as they are
pub(crate) fn unify_column(cells: Vec<Scalar>) -> (ColumnType, Vec<Scalar>) {
    let mut any_null = false;
    let mut all_int = true;
    let mut all_numeric = true;
    let mut all_bool = true;

    for cell in &cells {
        match cell {
            Scalar::Null => any_null = true,
            Scalar::Integer(_) => all_bool = false,
            Scalar::Float(_) => {
                all_int = false;
                all_bool = false;
            }
            Scalar::Bool(_) => {
                all_int = false;
                all_numeric = false;
            }
            Scalar::Text(_) => {
                all_int = false;
                all_numeric = false;
                all_bool = false;
            }
        }
    }

    if all_int && !any_null {
        // Covers the zero-row column too.
        (ColumnType::Integer, cells)
    } else if all_numeric {
        let cells = cells
            .into_iter()
            .map(|c| Scalar::Float(c.as_f64().unwrap_or(f64::NAN)))
            .collect();
        (ColumnType::Float, cells)
    } else if all_bool && !any_null {
        (ColumnType::Bool, cells)
    } else {
        (ColumnType::Text, cells)
    }
}

fn table_from_columns(column_names: Vec<String>, columns: Vec<(ColumnType, Vec<Scalar>)>) -> Table {
    let n_rows = columns.first().map_or(0, |(_, c)| c.len());
    let mut column_types = Vec::with_capacity(columns.len());
    let mut rows: Vec<Vec<Scalar>> = (0..n_rows)
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();

    for (ty, cells) in columns {
        column_types.push(ty);
        for (row, cell) in rows.iter_mut().zip(cells) {
            row.push(cell);
        }
    }

    Table::new(column_names, column_types, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `to_json(orient='records')`):
///
/// ```json
/// [
///   { "a": 1, "b": 2.5, "label": "x" },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen key order; a key absent from a record is missing.
fn load_json(path: &Path) -> Result<Table> {
    let bytes = std::fs::read(path).map_err(|source| SplitError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_slice(&bytes)
        .map_err(|e| SplitError::parse(path, format!("invalid JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| SplitError::parse(path, "expected top-level JSON array"))?;

    let mut column_names: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut objects = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| SplitError::parse(path, format!("row {i} is not a JSON object")))?;
        for key in obj.keys() {
            if seen.insert(key.as_str()) {
                column_names.push(key.clone());
            }
        }
        objects.push(obj);
    }

    if column_names.is_empty() {
        return Err(SplitError::parse(path, "no columns to parse from file"));
    }

    let columns = column_names
        .iter()
        .map(|name| {
            let cells = objects
                .iter()
                .map(|obj| obj.get(name).map_or(Scalar::Null, json_to_scalar))
                .collect();
            unify_column(cells)
        })
        .collect();

    Ok(table_from_columns(column_names, columns))
}

fn json_to_scalar(val: &JsonValue) -> Scalar {
    match val {
        JsonValue::String(s) => Scalar::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Scalar::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Scalar::Float(f)
            } else {
                Scalar::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Scalar::Bool(*b),
        JsonValue::Null => Scalar::Null,
        other => Scalar::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file. Every top-level column becomes a table column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nested columns are rendered as text.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| SplitError::parse(path, format!("reading parquet metadata: {e}")))?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| SplitError::parse(path, format!("building parquet reader: {e}")))?;

    let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    if names.is_empty() {
        return Err(SplitError::parse(path, "no columns to parse from file"));
    }
    let mut cells: Vec<Vec<Scalar>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| SplitError::parse(path, format!("reading parquet record batch: {e}")))?;
        for (col_idx, column) in cells.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            column.extend((0..batch.num_rows()).map(|row| extract_scalar(array, row)));
        }
    }

    let columns = cells.into_iter().map(unify_column).collect();
    Ok(table_from_columns(dedup_names(names), columns))
}

// -- Arrow helpers --

/// Extract a single value from an Arrow column at a given row.
fn extract_scalar(col: &ArrayRef, row: usize) -> Scalar {
    if col.is_null(row) {
        return Scalar::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Scalar::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Scalar::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => Scalar::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Scalar::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Scalar::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Scalar::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Scalar::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Scalar::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Scalar::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(Scalar::Float(v as f64), Scalar::Integer)
        }
        DataType::Float32 => Scalar::Float(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => Scalar::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Scalar::Bool(col.as_boolean().value(row)),
        other => array_value_to_string(col.as_ref(), row)
            .map(Scalar::Text)
            .unwrap_or_else(|_| Scalar::Text(format!("{other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn read(text: &str) -> Result<Table> {
        read_delimited(text.as_bytes(), &LoadOptions::default())
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn infers_column_types() {
        let table = read("i,f,b,s,mixed\n1,1.5,true,x,1\n2,2,False,y,two\n").unwrap();
        assert_eq!(
            table.column_types,
            vec![
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::Bool,
                ColumnType::Text,
                ColumnType::Text,
            ]
        );
        assert_eq!(
            table.rows[1],
            vec![
                Scalar::Integer(2),
                Scalar::Float(2.0),
                Scalar::Bool(false),
                Scalar::from("y"),
                Scalar::from("two"),
            ]
        );
        // Text columns keep the literal spelling of numeric-looking cells.
        assert_eq!(table.rows[0][4], Scalar::from("1"));
    }

    #[test]
    fn missing_integer_promotes_to_float() {
        let table = read("a,b\n1,x\n,NA\n3,z\n").unwrap();
        assert_eq!(table.column_types, vec![ColumnType::Float, ColumnType::Text]);
        assert_eq!(table.rows[0][0], Scalar::Float(1.0));
        assert!(table.rows[1][0].is_null());
        assert_eq!(table.rows[1][1], Scalar::Null);
    }

    #[test]
    fn all_missing_column_is_float() {
        let table = read("a,b\n1,\n2,\n").unwrap();
        assert_eq!(table.column_types[1], ColumnType::Float);
        assert!(table.rows.iter().all(|r| r[1].is_null()));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let table = read("a,a,b,a\n1,2,3,4\n").unwrap();
        assert_eq!(table.column_names, vec!["a", "a.1", "b", "a.2"]);
    }

    #[test]
    fn dedup_skips_names_already_taken() {
        let names = dedup_names(vec!["a".into(), "a.1".into(), "a".into()]);
        assert_eq!(names, vec!["a", "a.1", "a.2"]);
    }

    #[test]
    fn unequal_field_count_is_parse_error() {
        let err = read("a,b,c\n1,2,3\n4,5\n").unwrap_err();
        assert!(matches!(err, SplitError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn invalid_utf8_is_parse_error() {
        let err = read_delimited(&b"a,b\n1,\xff\xfe\n"[..], &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SplitError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn empty_input_is_parse_error() {
        let err = read("").unwrap_err();
        assert!(matches!(err, SplitError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let table = read("a,b\n1,2\n\n3,4\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn header_only_keeps_columns() {
        let table = read("a,b,c\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.n_columns(), 3);
    }

    #[test]
    fn custom_delimiter() {
        let options = LoadOptions { delimiter: b';' };
        let table = read_delimited("a;b\n1;2\n".as_bytes(), &options).unwrap();
        assert_eq!(table.rows, vec![vec![Scalar::Integer(1), Scalar::Integer(2)]]);
    }

    #[test]
    fn missing_file_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("absent.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SplitError::FileAccess { .. }), "{err:?}");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("data.xlsx"), &LoadOptions::default()).unwrap_err();
        match err {
            SplitError::UnsupportedFormat { extension } => assert_eq!(extension, "xlsx"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tsv_uses_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.tsv", b"a\tb\n1\t2\n");
        let table = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.column_names, vec!["a", "b"]);
    }

    #[test]
    fn json_records_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "data.json",
            br#"[{"z": 1, "a": 2.5, "label": "p"}, {"z": 3, "a": null, "label": "q", "extra": true}]"#,
        );
        let table = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.column_names, vec!["z", "a", "label", "extra"]);
        assert_eq!(
            table.column_types,
            vec![ColumnType::Integer, ColumnType::Float, ColumnType::Text, ColumnType::Text]
        );
        assert!(table.rows[1][1].is_null());
        assert_eq!(table.rows[0][3], Scalar::Null);
        assert_eq!(table.rows[1][3], Scalar::Bool(true));
    }

    #[test]
    fn json_must_be_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.json", br#"{"a": [1, 2]}"#);
        let err = load_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SplitError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn parquet_columns_map_to_scalars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("n", DataType::Int64, false),
            Field::new("v", DataType::Float64, true),
            Field::new("flag", DataType::Boolean, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(Float64Array::from(vec![Some(0.5), None])),
                Arc::new(BooleanArray::from(vec![true, false])),
                Arc::new(StringArray::from(vec![Some("a"), None])),
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.column_names, vec!["n", "v", "flag", "name"]);
        assert_eq!(
            table.column_types,
            vec![ColumnType::Integer, ColumnType::Float, ColumnType::Bool, ColumnType::Text]
        );
        assert_eq!(
            table.rows[0],
            vec![Scalar::Integer(1), Scalar::Float(0.5), Scalar::Bool(true), Scalar::from("a")]
        );
        assert!(table.rows[1][1].is_null());
        assert_eq!(table.rows[1][3], Scalar::Null);
    }

    #[test]
    fn corrupt_parquet_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.parquet", b"not parquet at all");
        let err = load_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SplitError::Parse { .. }), "{err:?}");
    }
}
