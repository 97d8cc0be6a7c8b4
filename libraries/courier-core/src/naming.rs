//! Filesystem-safe naming for package folders and generated documents

/// Sanitize a string for use as a single path component
///
/// Characters that are invalid on common filesystems become `_`; the result
/// is trimmed. An input that sanitizes to nothing becomes `_`.
pub fn sanitize_component(s: &str) -> String {
    let cleaned = s
        .chars()
        .map(|c| match c {
            // Invalid on Windows: < > : " / \ | ? *
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Title as it appears in generated file names: spaces become underscores
pub fn underscored(title: &str) -> String {
    sanitize_component(title).replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("00012345"), "00012345");
        assert_eq!(sanitize_component("AC/DC"), "AC_DC");
        assert_eq!(sanitize_component("Song: The Remix"), "Song_ The Remix");
        assert_eq!(sanitize_component("  Trimmed  "), "Trimmed");
        assert_eq!(sanitize_component(".."), "_");
        assert_eq!(sanitize_component(""), "_");
    }

    #[test]
    fn test_underscored() {
        assert_eq!(underscored("Test Song"), "Test_Song");
        assert_eq!(underscored("Amazing Grace (Live)"), "Amazing_Grace_(Live)");
        assert_eq!(underscored("What?"), "What_");
    }
}
