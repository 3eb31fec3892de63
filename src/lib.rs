//! Load a tabular dataset from disk and split it into a feature matrix and a
//! target vector ready for a modeling routine.

pub mod data;
pub mod error;

pub use data::loader::{load_file, read_delimited, LoadOptions};
pub use data::model::{ColumnType, FeatureMatrix, Scalar, Table, TargetVector};
pub use data::split::{get_x_y, get_x_y_with, split_table};
pub use error::{Result, SplitError};
