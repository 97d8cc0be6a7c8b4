/// Track duration normalization
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token emitted for any duration that cannot be interpreted
pub const ZERO_DURATION: &str = "PT0M0S";

/// A track length expressed as minutes and seconds
///
/// Spreadsheet durations arrive as free-form text. Operators type `M:SS`,
/// but the sheet often stores the cell as a time of day, so the text comes
/// back as `H:MM:SS` with a spurious leading component. Parsing therefore
/// follows a fixed rule:
///
/// - `MM:SS` → minutes and seconds as written
/// - `H:MM:SS` → the leading component is dropped; `MM` is minutes, `SS` seconds
/// - anything else → no duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackDuration {
    pub minutes: u32,
    pub seconds: u32,
}

impl TrackDuration {
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self { minutes, seconds }
    }

    /// Parse a spreadsheet duration using the reinterpretation rule above
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.split(':').collect();

        let (minutes, seconds) = match parts.as_slice() {
            [_leading, minutes, seconds] => (*minutes, *seconds),
            [minutes, seconds] => (*minutes, *seconds),
            _ => return None,
        };

        Some(Self {
            minutes: parse_component(minutes)?,
            seconds: parse_component(seconds)?,
        })
    }
}

fn parse_component(part: &str) -> Option<u32> {
    let part = part.trim();
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for TrackDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PT{}M{}S", self.minutes, self.seconds)
    }
}

/// Convert a spreadsheet duration into an ISO-8601 style `PTxMyS` token
///
/// Falls back to `PT0M0S` for every shape `TrackDuration::parse` rejects.
pub fn format_duration(text: &str) -> String {
    match TrackDuration::parse(text) {
        Some(duration) => duration.to_string(),
        None => {
            tracing::debug!(input = text, "Unrecognized duration, using zero duration");
            ZERO_DURATION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_minutes_seconds() {
        assert_eq!(format_duration("5:30"), "PT5M30S");
        assert_eq!(format_duration("3:45"), "PT3M45S");
        assert_eq!(format_duration("0:07"), "PT0M7S");
    }

    #[test]
    fn test_three_components_drop_leading() {
        assert_eq!(format_duration("1:02:03"), "PT2M3S");
        assert_eq!(format_duration("03:45:00"), "PT45M0S");
        assert_eq!(format_duration("0:04:12"), "PT4M12S");
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert_eq!(format_duration(""), ZERO_DURATION);
        assert_eq!(format_duration("345"), ZERO_DURATION);
        assert_eq!(format_duration("PT0M0S"), ZERO_DURATION);
        assert_eq!(format_duration("1:2:3:4"), ZERO_DURATION);
        assert_eq!(format_duration("a:bc"), ZERO_DURATION);
        assert_eq!(format_duration("-1:30"), ZERO_DURATION);
        assert_eq!(format_duration(":30"), ZERO_DURATION);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(format_duration(" 4 : 05 "), "PT4M5S");
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackDuration::new(12, 0).to_string(), "PT12M0S");
    }

    proptest! {
        #[test]
        fn prop_two_components_convert_directly(m in 0u32..1000, s in 0u32..60) {
            prop_assert_eq!(format_duration(&format!("{}:{:02}", m, s)), format!("PT{}M{}S", m, s));
        }

        #[test]
        fn prop_leading_component_is_discarded(h in 0u32..24, m in 0u32..60, s in 0u32..60) {
            prop_assert_eq!(
                format_duration(&format!("{}:{:02}:{:02}", h, m, s)),
                format!("PT{}M{}S", m, s)
            );
        }

        #[test]
        fn prop_colon_free_text_is_zero(text in "[^:]*") {
            prop_assert_eq!(format_duration(&text), ZERO_DURATION);
        }
    }
}
