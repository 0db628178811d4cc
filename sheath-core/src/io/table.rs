// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::SheathError;

/// Delimited or columnar table layouts inferred from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Parquet,
}

impl TableFormat {
    /// Infer table format from a path extension
    ///
    /// # Examples
    ///
    /// ```
    /// use sheath_core::io::TableFormat;
    ///
    /// assert_eq!(TableFormat::from_path("stats.csv"), Some(TableFormat::Csv));
    /// assert_eq!(TableFormat::from_path("stats.txt"), Some(TableFormat::Tsv));
    /// assert_eq!(TableFormat::from_path("stats.pq"), Some(TableFormat::Parquet));
    /// assert_eq!(TableFormat::from_path("stats"), None);
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<TableFormat> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())?;

        match extension.as_str() {
            "csv" => Some(TableFormat::Csv),
            "tsv" | "txt" => Some(TableFormat::Tsv),
            "parquet" | "pq" => Some(TableFormat::Parquet),
            _ => None,
        }
    }
}

fn create_output<P: AsRef<Path>>(path: P) -> Result<File, SheathError> {
    File::create(&path).map_err(|err| {
        SheathError::TableWriteError(format!(
            "Could not create {} ({})",
            path.as_ref().display(),
            err
        ))
    })
}

/// Write a table to a delimited text file
///
/// # Arguments
///
/// * `df` - A DataFrame
/// * `path` - Output file path
/// * `separator` - Field separator byte (e.g. b',' or b'\t')
/// * `header` - Whether the output file should contain a header
pub fn write_table_delimited<P: AsRef<Path>>(
    df: &mut DataFrame,
    path: P,
    separator: u8,
    header: bool,
) -> Result<(), SheathError> {
    let mut output = create_output(&path)?;

    CsvWriter::new(&mut output)
        .include_header(header)
        .with_separator(separator)
        .finish(df)
        .map_err(|err| SheathError::TableWriteError(err.to_string()))
}

/// Write a table to a parquet file
pub fn write_table_pq<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<(), SheathError> {
    let mut output = create_output(&path)?;

    ParquetWriter::new(&mut output)
        .finish(df)
        .map(|_| ())
        .map_err(|err| SheathError::TableWriteError(err.to_string()))
}

/// Write a DataFrame to disk with the format implied by its extension
///
/// # Arguments
///
/// * `df` - A DataFrame
/// * `path` - Output path ending in csv, tsv, txt, parquet or pq
///
/// # Examples
///
/// ```no_run
/// use polars::prelude::*;
/// use sheath_core::io::write_table;
///
/// let column = vec![Column::new("axon_area".into(), [2.5, 3.1, 3.4])];
/// let mut df: DataFrame = DataFrame::new(column).unwrap();
///
/// write_table(&mut df, "morphometrics.csv").unwrap()
/// ```
pub fn write_table<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<(), SheathError> {
    match TableFormat::from_path(&path) {
        Some(TableFormat::Csv) => write_table_delimited(df, path, b',', true),
        Some(TableFormat::Tsv) => write_table_delimited(df, path, b'\t', true),
        Some(TableFormat::Parquet) => write_table_pq(df, path),
        None => Err(SheathError::TableWriteError(
            "Provided table path has an invalid extension. Must be one of: csv, tsv, txt, parquet, or pq".to_string(),
        )),
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_write_table_csv() {
        let path = std::env::temp_dir().join(format!("sheath_table_{}.csv", std::process::id()));

        let mut df = DataFrame::new(vec![
            Column::new("axon_id".into(), [1u32, 2]),
            Column::new("axon_area".into(), [0.5f64, 1.25]),
        ])
        .unwrap();

        write_table(&mut df, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();

        assert_eq!(lines.next(), Some("axon_id,axon_area"));
        assert_eq!(lines.next(), Some("1,0.5"));
        assert_eq!(lines.next(), Some("2,1.25"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_table_bad_extension() {
        let mut df = DataFrame::new(vec![Column::new("a".into(), [1u32])]).unwrap();
        let result = write_table(&mut df, "table.xlsx");

        assert!(matches!(result, Err(SheathError::TableWriteError(_))));
    }

    #[test]
    fn test_write_table_missing_parent() {
        let mut df = DataFrame::new(vec![Column::new("a".into(), [1u32])]).unwrap();
        let result = write_table(&mut df, "/nonexistent_sheath_dir/table.csv");

        assert!(result.is_err());
    }
}
