use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{Result, SplitError};

// ---------------------------------------------------------------------------
// Scalar – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a CSV reader infers.
#[derive(Debug, Clone)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Missing value in a text, bool or mixed column. Missing numeric
    /// cells are `Float(NaN)` instead.
    Null,
}

// -- Manual Eq/Ord so Scalar can be compared and collected into sets --

/// Floats compare by `total_cmp`, so NaN equals NaN and `-0.0 != 0.0`,
/// agreeing with `Ord` and `Hash`.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Scalar {}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Scalar::*;
        fn discriminant(v: &Scalar) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Scalar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Text(s) => s.hash(state),
            Scalar::Integer(i) => i.hash(state),
            Scalar::Float(f) => f.to_bits().hash(state),
            Scalar::Bool(b) => b.hash(state),
            Scalar::Null => {}
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Text(s) => write!(f, "{s}"),
            Scalar::Null => write!(f, "<null>"),
        }
    }
}

/// Untagged: numbers stay JSON numbers; `Null` and non-finite floats become `null`.
impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Integer(i) => serializer.serialize_i64(*i),
            Scalar::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Scalar::Float(_) | Scalar::Null => serializer.serialize_none(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl Scalar {
    /// Numeric view of the value. Booleans map to 0/1; text and nulls have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(*v),
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(_) | Scalar::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Float(v) => v.is_nan(),
            _ => false,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

// ---------------------------------------------------------------------------
// ColumnType – inferred dtype of a whole column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    Bool,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Text => "text",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Table – the loaded tabular dataset
// ---------------------------------------------------------------------------

/// Column-named, row-major table as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Header names, left to right, de-duplicated.
    pub column_names: Vec<String>,
    /// One inferred type per column.
    pub column_types: Vec<ColumnType>,
    /// Every row has exactly `column_names.len()` cells.
    pub rows: Vec<Vec<Scalar>>,
}

impl Table {
    pub fn new(
        column_names: Vec<String>,
        column_types: Vec<ColumnType>,
        rows: Vec<Vec<Scalar>>,
    ) -> Self {
        debug_assert_eq!(column_names.len(), column_types.len());
        debug_assert!(rows.iter().all(|r| r.len() == column_names.len()));
        Table {
            column_names,
            column_types,
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// Position of the column with exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Scalar> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }
}

// ---------------------------------------------------------------------------
// FeatureMatrix / TargetVector – the split outputs
// ---------------------------------------------------------------------------

/// Predictor values, one row per observation. Carries no column names.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<Vec<Scalar>>,
    n_columns: usize,
}

impl FeatureMatrix {
    pub(crate) fn new(rows: Vec<Vec<Scalar>>, n_columns: usize) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == n_columns));
        FeatureMatrix { rows, n_columns }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of feature columns, known even when there are no rows.
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&[Scalar]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    /// Values of feature column `j`, top to bottom.
    pub fn column(&self, j: usize) -> Option<Vec<&Scalar>> {
        (j < self.n_columns).then(|| self.rows.iter().map(|r| &r[j]).collect())
    }

    pub fn into_rows(self) -> Vec<Vec<Scalar>> {
        self.rows
    }

    /// Dense numeric copy. Fails on the first text or null cell.
    pub fn to_f64(&self) -> Result<Vec<Vec<f64>>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| v.as_f64().ok_or(SplitError::NonNumeric { row: i, column: j }))
                    .collect()
            })
            .collect()
    }
}

impl Serialize for FeatureMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

/// Outcome values, one per observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TargetVector {
    values: Vec<Scalar>,
}

impl TargetVector {
    pub(crate) fn new(values: Vec<Scalar>) -> Self {
        TargetVector { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn get(&self, i: usize) -> Option<&Scalar> {
        self.values.get(i)
    }

    pub fn into_values(self) -> Vec<Scalar> {
        self.values
    }

    /// Dense numeric copy; `column` in a `NonNumeric` error is always 0.
    pub fn to_f64(&self) -> Result<Vec<f64>> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| v.as_f64().ok_or(SplitError::NonNumeric { row: i, column: 0 }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn scalar_ordering_groups_by_kind() {
        let set: BTreeSet<Scalar> = [
            Scalar::from("b"),
            Scalar::from(2_i64),
            Scalar::Null,
            Scalar::from(1.5),
            Scalar::from(true),
            Scalar::from(-1_i64),
        ]
        .into_iter()
        .collect();
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Integer(-1),
                Scalar::Integer(2),
                Scalar::Float(1.5),
                Scalar::Text("b".into()),
            ]
        );
    }

    #[test]
    fn scalar_equality_agrees_with_ord_and_hash() {
        use std::collections::HashSet;

        let nan = Scalar::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(nan.cmp(&nan.clone()), std::cmp::Ordering::Equal);

        let set: HashSet<Scalar> = [nan.clone(), nan].into_iter().collect();
        assert_eq!(set.len(), 1);

        let (pos, neg) = (Scalar::Float(0.0), Scalar::Float(-0.0));
        assert_ne!(pos, neg);
        assert_ne!(pos.cmp(&neg), std::cmp::Ordering::Equal);
        assert_ne!(Scalar::Integer(1), Scalar::Float(1.0));
    }

    #[test]
    fn scalar_serializes_untagged() {
        let values = vec![
            Scalar::Integer(3),
            Scalar::Float(0.5),
            Scalar::Float(f64::NAN),
            Scalar::Bool(false),
            Scalar::Text("x".into()),
            Scalar::Null,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[3,0.5,null,false,"x",null]"#);
    }

    #[test]
    fn table_column_lookup() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![ColumnType::Integer, ColumnType::Text],
            vec![
                vec![Scalar::Integer(1), Scalar::from("p")],
                vec![Scalar::Integer(2), Scalar::from("q")],
            ],
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("b"), Some(1));
        assert!(table.column("missing").is_none());
        let b: Vec<_> = table.column("b").unwrap().cloned().collect();
        assert_eq!(b, vec![Scalar::from("p"), Scalar::from("q")]);
    }

    #[test]
    fn feature_matrix_numeric_view_rejects_text() {
        let x = FeatureMatrix::new(
            vec![
                vec![Scalar::Integer(1), Scalar::Bool(true)],
                vec![Scalar::Float(2.5), Scalar::from("oops")],
            ],
            2,
        );
        match x.to_f64() {
            Err(SplitError::NonNumeric { row, column }) => assert_eq!((row, column), (1, 1)),
            other => panic!("expected NonNumeric, got {other:?}"),
        }

        let ok = FeatureMatrix::new(vec![vec![Scalar::Integer(1), Scalar::Bool(true)]], 2);
        assert_eq!(ok.to_f64().unwrap(), vec![vec![1.0, 1.0]]);
    }

    #[test]
    fn feature_matrix_column_bounds() {
        let x = FeatureMatrix::new(Vec::new(), 3);
        assert!(x.is_empty());
        assert_eq!(x.n_columns(), 3);
        assert_eq!(x.column(2), Some(Vec::new()));
        assert_eq!(x.column(3), None);
    }
}
