use std::path::Path;

use log::info;

use super::loader::{load_file, LoadOptions};
use super::model::{FeatureMatrix, Table, TargetVector};
use crate::error::{Result, SplitError};

/// Load `path` and split it into features and target, reading delimited
/// files with the default comma separator.
///
/// `target` must equal one header name exactly. Every other column goes
/// into the feature matrix, left to right; row order is kept in both
/// outputs, so `x.row(i)` and `y.get(i)` describe the same observation.
///
/// ```no_run
/// let (x, y) = feature_split::get_x_y("data/train.csv", "target")?;
/// assert_eq!(x.len(), y.len());
/// # Ok::<(), feature_split::SplitError>(())
/// ```
pub fn get_x_y(path: impl AsRef<Path>, target: &str) -> Result<(FeatureMatrix, TargetVector)> {
    get_x_y_with(path, target, &LoadOptions::default())
}

/// [`get_x_y`] with explicit loader options.
pub fn get_x_y_with(
    path: impl AsRef<Path>,
    target: &str,
    options: &LoadOptions,
) -> Result<(FeatureMatrix, TargetVector)> {
    let path = path.as_ref();
    let table = load_file(path, options)?;
    let (x, y) = split_table(table, target)?;
    info!(
        "split {}: {} rows, {} features, target '{target}'",
        path.display(),
        x.len(),
        x.n_columns()
    );
    Ok((x, y))
}

/// Move the `target` column out of `table`; everything else becomes features.
pub fn split_table(table: Table, target: &str) -> Result<(FeatureMatrix, TargetVector)> {
    let target_idx = table
        .column_index(target)
        .ok_or_else(|| SplitError::KeyNotFound {
            column: target.to_string(),
            available: table.column_names.clone(),
        })?;
    let n_features = table.n_columns() - 1;

    let mut features = Vec::with_capacity(table.len());
    let mut values = Vec::with_capacity(table.len());
    for mut row in table.rows {
        values.push(row.remove(target_idx));
        features.push(row);
    }

    Ok((FeatureMatrix::new(features, n_features), TargetVector::new(values)))
}
