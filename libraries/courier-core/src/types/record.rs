/// Normalized release metadata
use serde::{Deserialize, Serialize};

use super::duration::{format_duration, ZERO_DURATION};

/// Sentinel values substituted for missing spreadsheet cells
pub mod defaults {
    pub const ARTIST: &str = "UNKNOWN_ARTIST";
    pub const LABEL: &str = "UNKNOWN_LABEL";
    pub const ISRC: &str = "UNKNOWN_ISRC";
    pub const UPC: &str = "UNKNOWN_UPC";
    pub const TITLE: &str = "UNKNOWN_TRACK";
    pub const PARENTAL_ADVISORY: &str = "NoAdviceAvailable";
    pub const DURATION: &str = super::ZERO_DURATION;
}

/// One track of a release, as handed over by the record source
///
/// UPC and ISRC are opaque strings; leading zeros are significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Primary artist(s), as displayed
    pub primary_artists: String,

    /// Label / rights company
    pub label: String,

    /// International Standard Recording Code
    pub isrc: String,

    /// Universal Product Code of the release
    pub upc: String,

    /// Track title
    pub title: String,

    /// Parental warning classification
    pub parental_advisory: String,

    /// Free-form duration text (`M:SS` or `H:MM:SS`)
    pub duration: String,

    /// Genre, if the source provides one
    pub genre: Option<String>,

    /// Year for the publication (℗) line
    pub published_year: Option<i32>,

    /// Year for the copyright (©) line
    pub copyright_year: Option<i32>,
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self {
            primary_artists: defaults::ARTIST.to_string(),
            label: defaults::LABEL.to_string(),
            isrc: defaults::ISRC.to_string(),
            upc: defaults::UPC.to_string(),
            title: defaults::TITLE.to_string(),
            parental_advisory: defaults::PARENTAL_ADVISORY.to_string(),
            duration: defaults::DURATION.to_string(),
            genre: None,
            published_year: None,
            copyright_year: None,
        }
    }
}

impl MetadataRecord {
    /// Create a record with the given identity; everything else is defaulted
    pub fn new(title: impl Into<String>, isrc: impl Into<String>, upc: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            isrc: isrc.into(),
            upc: upc.into(),
            ..Self::default()
        }
    }

    pub fn with_artists(mut self, artists: impl Into<String>) -> Self {
        self.primary_artists = artists.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_parental_advisory(mut self, advisory: impl Into<String>) -> Self {
        self.parental_advisory = advisory.into();
        self
    }

    pub fn with_years(mut self, published: Option<i32>, copyright: Option<i32>) -> Self {
        self.published_year = published;
        self.copyright_year = copyright;
        self
    }

    /// Duration as a `PTxMyS` token
    pub fn formatted_duration(&self) -> String {
        format_duration(&self.duration)
    }

    /// Short label for log lines
    pub fn describe(&self) -> String {
        format!("{} (ISRC: {}, UPC: {})", self.title, self.isrc, self.upc)
    }
}
