//! Export helpers for sizing result tables.
//!
//! A result table is a flat `quantity -> value` map. It is written either as a two-column
//! CSV (`quantity,value`) or as a JSON report that also carries the case name and any
//! serializable iteration history.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub const CSV_HEADER: [&str; 2] = ["quantity", "value"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Write(#[from] io::Error),
}

/// Create a writer for the target path; `-` means stdout. Parent directories are created.
pub fn writer_for_path(path: &Path) -> Result<Box<dyn Write>, ExportError> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let file = File::create(path).map_err(io_err)?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Write `table` as `quantity,value` rows in key order.
pub fn write_table_csv<W: Write>(writer: W, table: &BTreeMap<String, f64>) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for (quantity, value) in table {
        let value = value.to_string();
        csv.write_record([quantity.as_str(), value.as_str()])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn table_to_csv_string(table: &BTreeMap<String, f64>) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_table_csv(&mut buffer, table)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn save_table_csv(path: &Path, table: &BTreeMap<String, f64>) -> Result<(), ExportError> {
    write_table_csv(writer_for_path(path)?, table)
}

/// JSON document for one sized case. Non-finite values serialize as `null`.
#[derive(Debug, Serialize)]
pub struct Report<'a, H: Serialize> {
    pub case: &'a str,
    pub method: &'a str,
    pub table: &'a BTreeMap<String, f64>,
    pub history: &'a [H],
}

pub fn write_report_json<W: Write, H: Serialize>(
    mut writer: W,
    report: &Report<'_, H>,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn report_to_json_string<H: Serialize>(report: &Report<'_, H>) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn save_report_json<H: Serialize>(path: &Path, report: &Report<'_, H>) -> Result<(), ExportError> {
    write_report_json(writer_for_path(path)?, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_follow_key_order() {
        let table = BTreeMap::from([
            ("Weight|takeoff".to_string(), 1500.5),
            ("Energy|total".to_string(), 2.0e8),
        ]);
        let text = table_to_csv_string(&table).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "quantity,value");
        assert_eq!(lines[1], "Energy|total,200000000");
        assert_eq!(lines[2], "Weight|takeoff,1500.5");
    }

    #[test]
    fn nan_becomes_null_in_json() {
        let table = BTreeMap::from([("FigureOfMerit|LiftRotor|cruise".to_string(), f64::NAN)]);
        let history: [u8; 0] = [];
        let report = Report {
            case: "demo",
            method: "fixed_point",
            table: &table,
            history: &history,
        };
        let json = report_to_json_string(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["table"]["FigureOfMerit|LiftRotor|cruise"].is_null());
        assert_eq!(value["case"], "demo");
    }
}
