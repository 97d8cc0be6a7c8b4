//! Column normalization and sentinel defaults

use courier_core::types::defaults;
use courier_core::MetadataRecord;
use std::collections::HashMap;

/// Column names after header normalization
pub mod columns {
    pub const ARTISTS: &str = "primary_artists";
    pub const LABEL: &str = "label";
    pub const ISRC: &str = "isrc_code";
    pub const UPC: &str = "upc_code";
    pub const TITLE: &str = "track_titles";
    pub const PARENTAL_ADVISORY: &str = "parental_advisory";
    pub const DURATION: &str = "duration";
    pub const GENRE: &str = "genre";
    pub const PUBLISHED_YEAR: &str = "published_year";
    pub const COPYRIGHT_YEAR: &str = "copyright_year";
}

/// One spreadsheet cell, reduced to what the record shape needs
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Cell rendered as text, `None` when blank
    ///
    /// Integral numbers lose their fractional part so that a UPC typed into a
    /// numeric cell comes back as `"12345"`, not `"12345.0"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Self::Number(n) if n.is_finite() => Some(n.to_string()),
            Self::Number(_) | Self::Empty => None,
        }
    }

    /// Cell as a year, `None` when blank or not a whole number
    pub fn as_year(&self) -> Option<i32> {
        match self {
            Self::Number(n) if n.fract() == 0.0 => i32::try_from(*n as i64).ok(),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_text().is_none()
    }
}

/// Row keyed by normalized column name
pub type RawRow = HashMap<String, Cell>;

/// Normalize a header cell: trimmed, lowercase, spaces replaced with `_`
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Build a record from a row, substituting sentinel defaults for blanks
pub fn record_from_row(row: &RawRow) -> MetadataRecord {
    let text = |column: &str, fallback: &str| {
        row.get(column)
            .and_then(Cell::as_text)
            .unwrap_or_else(|| fallback.to_string())
    };
    let year = |column: &str| row.get(column).and_then(Cell::as_year);

    MetadataRecord {
        primary_artists: text(columns::ARTISTS, defaults::ARTIST),
        label: text(columns::LABEL, defaults::LABEL),
        isrc: text(columns::ISRC, defaults::ISRC),
        upc: text(columns::UPC, defaults::UPC),
        title: text(columns::TITLE, defaults::TITLE),
        parental_advisory: text(columns::PARENTAL_ADVISORY, defaults::PARENTAL_ADVISORY),
        duration: text(columns::DURATION, defaults::DURATION),
        genre: row.get(columns::GENRE).and_then(Cell::as_text),
        published_year: year(columns::PUBLISHED_YEAR),
        copyright_year: year(columns::COPYRIGHT_YEAR),
    }
}
