/// Data layer: core types, loading, and splitting.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Table (names, inferred dtypes, rows)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  split   │  project target column out → (FeatureMatrix, TargetVector)
///   └──────────┘
/// ```
pub mod loader;
pub mod model;
pub mod split;
