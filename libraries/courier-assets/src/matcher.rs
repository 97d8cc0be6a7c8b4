//! Title-to-filename matching strategies

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

/// Decides whether a filename belongs to a track title
///
/// The resolver only asks this question; which files count as a match is
/// entirely up to the implementation.
pub trait TitleMatcher: Send + Sync {
    fn matches(&self, title: &str, filename: &str) -> bool;

    /// Short name for diagnostics
    fn name(&self) -> &'static str;
}

/// Lowercase and turn spaces into underscores, as release files are named
pub fn normalize_title(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "_")
}

fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

/// Filename contains the normalized title (default)
///
/// Overlapping titles are ambiguous: "Grace" also matches
/// `amazing_grace.mp3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl TitleMatcher for SubstringMatcher {
    fn matches(&self, title: &str, filename: &str) -> bool {
        let needle = normalize_title(title);
        !needle.is_empty() && filename.to_lowercase().contains(&needle)
    }

    fn name(&self) -> &'static str {
        "substring"
    }
}

/// Normalized file stem equals the normalized title
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactStemMatcher;

impl TitleMatcher for ExactStemMatcher {
    fn matches(&self, title: &str, filename: &str) -> bool {
        normalize_title(file_stem(filename)) == normalize_title(title)
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Levenshtein similarity between stem and title at or above a threshold
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    /// Minimum similarity (0-100)
    threshold: u8,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self { threshold: 85 }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: threshold.min(100),
        }
    }

    /// Similarity between a title and a filename stem (0-100)
    pub fn score(title: &str, filename: &str) -> u8 {
        let similarity =
            normalized_levenshtein(&normalize_title(file_stem(filename)), &normalize_title(title));
        (similarity * 100.0).round() as u8
    }
}

impl TitleMatcher for FuzzyMatcher {
    fn matches(&self, title: &str, filename: &str) -> bool {
        Self::score(title, filename) >= self.threshold
    }

    fn name(&self) -> &'static str {
        "fuzzy"
    }
}

/// Configurable matcher selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    Substring,
    Exact,
    Fuzzy,
}

impl MatcherKind {
    /// Build the matcher; `fuzzy_threshold` only applies to `Fuzzy`
    pub fn build(self, fuzzy_threshold: u8) -> Box<dyn TitleMatcher> {
        match self {
            Self::Substring => Box::new(SubstringMatcher),
            Self::Exact => Box::new(ExactStemMatcher),
            Self::Fuzzy => Box::new(FuzzyMatcher::new(fuzzy_threshold)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Amazing Grace"), "amazing_grace");
        assert_eq!(normalize_title("  Test Song "), "test_song");
    }

    #[test]
    fn test_substring_matcher() {
        let m = SubstringMatcher;
        assert!(m.matches("Amazing Grace", "amazing_grace.mp3"));
        assert!(m.matches("Amazing Grace", "01_AMAZING_GRACE_master.wav"));
        assert!(m.matches("Amazing Grace", "amazing_graceful.mp3"));
        assert!(!m.matches("Amazing Grace", "amazing grace.mp3"));
        assert!(!m.matches("Amazing Grace", "grace.mp3"));
        assert!(!m.matches("", "anything.mp3"));
    }

    #[test]
    fn test_exact_stem_matcher() {
        let m = ExactStemMatcher;
        assert!(m.matches("Amazing Grace", "amazing_grace.mp3"));
        assert!(m.matches("Amazing Grace", "Amazing Grace.mp3"));
        assert!(!m.matches("Amazing Grace", "amazing_graceful.mp3"));
        assert!(!m.matches("Amazing Grace", "01_amazing_grace.mp3"));
    }

    #[test]
    fn test_fuzzy_matcher() {
        let m = FuzzyMatcher::new(85);
        assert!(m.matches("Amazing Grace", "amazing_grace.mp3"));
        assert!(m.matches("Amazing Grace", "amazing_grac.mp3"));
        assert!(!m.matches("Amazing Grace", "how_great_thou_art.mp3"));
        assert_eq!(FuzzyMatcher::score("Test Song", "test_song.jpg"), 100);
    }

    #[test]
    fn test_matcher_kind_build() {
        assert_eq!(MatcherKind::default().build(85).name(), "substring");
        assert_eq!(MatcherKind::Exact.build(85).name(), "exact");
        assert_eq!(MatcherKind::Fuzzy.build(70).name(), "fuzzy");
    }
}
