//! Workbook and JSON readers

use crate::error::{IngestError, Result};
use crate::normalize::{normalize_header, record_from_row, Cell, RawRow};
use calamine::{open_workbook_auto, Data, Reader};
use courier_core::MetadataRecord;
use std::path::Path;
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Load records from a workbook or JSON file, chosen by extension
pub fn load_records(path: &Path) -> Result<Vec<MetadataRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let records = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path)?,
        "json" => load_json(path)?,
        _ => return Err(IngestError::UnsupportedFormat(path.display().to_string())),
    };

    info!(path = %path.display(), records = records.len(), "Loaded release metadata");
    Ok(records)
}

/// Read the first worksheet of a workbook; the first row holds the headers
pub fn load_workbook(path: &Path) -> Result<Vec<MetadataRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::NoWorksheet(path.display().to_string()))??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        warn!(path = %path.display(), "Worksheet is empty");
        return Ok(Vec::new());
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| normalize_header(&cell.to_string()))
        .collect();
    debug!(?headers, "Worksheet headers");

    let raw_rows = rows.map(|cells| {
        headers
            .iter()
            .zip(cells.iter())
            .map(|(header, data)| (header.clone(), cell_from_data(data)))
            .collect::<RawRow>()
    });

    Ok(collect_records(raw_rows))
}

/// Read a JSON array of row objects
pub fn load_json(path: &Path) -> Result<Vec<MetadataRecord>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let serde_json::Value::Array(items) = value else {
        return Err(IngestError::Malformed(format!(
            "{}: expected an array of row objects",
            path.display()
        )));
    };

    let mut raw_rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = item else {
            return Err(IngestError::Malformed(format!(
                "{}: row {} is not an object",
                path.display(),
                index + 1
            )));
        };

        raw_rows.push(
            fields
                .into_iter()
                .map(|(key, value)| (normalize_header(&key), cell_from_json(value)))
                .collect::<RawRow>(),
        );
    }

    Ok(collect_records(raw_rows))
}

fn collect_records(rows: impl IntoIterator<Item = RawRow>) -> Vec<MetadataRecord> {
    rows.into_iter()
        .filter(|row| {
            let blank = row.values().all(Cell::is_empty);
            if blank {
                debug!("Skipping empty row");
            }
            !blank
        })
        .map(|row| record_from_row(&row))
        .collect()
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) | Data::DateTimeIso(s) => Cell::Text(s.clone()),
        Data::DurationIso(s) => Cell::Text(iso_time_of_day(s).unwrap_or_else(|| s.clone())),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Text(time_of_day(dt.as_f64())),
    }
}

/// Render a workbook time serial as `H:MM`
///
/// Operators type `3:45` meaning three minutes forty-five; the workbook
/// stores it as a time of day (03:45:00). Keeping only hours and minutes
/// hands the duration rule the two components the operator typed.
fn time_of_day(serial: f64) -> String {
    let seconds = (serial.fract() * SECONDS_PER_DAY).round() as i64;
    format!("{}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

/// Render an ISO 8601 time value such as `PT03H45M00S` as `H:MM`
///
/// OpenDocument stores time cells this way. Days and seconds are dropped,
/// matching [`time_of_day`].
fn iso_time_of_day(value: &str) -> Option<String> {
    let rest = value.trim().strip_prefix('P')?;
    let (_, time) = rest.split_once('T')?;

    let (mut hours, mut minutes) = (0u64, 0u64);
    let mut number = String::new();
    for c in time.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'H' | 'M' | 'S' => {
                let whole = number.split('.').next().unwrap_or_default();
                let parsed: u64 = whole.parse().ok()?;
                match c {
                    'H' => hours = parsed,
                    'M' => minutes = parsed,
                    _ => {}
                }
                number.clear();
            }
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None;
    }
    Some(format!("{hours}:{minutes:02}"))
}

fn cell_from_json(value: serde_json::Value) -> Cell {
    match value {
        serde_json::Value::Null => Cell::Empty,
        serde_json::Value::String(s) => Cell::Text(s),
        serde_json::Value::Number(n) => n.as_f64().map_or(Cell::Empty, Cell::Number),
        other => Cell::Text(other.to_string()),
    }
}
