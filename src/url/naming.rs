//! Destination naming for fetched artifacts

/// Characters that cannot appear in a file name on common filesystems
const PATH_HOSTILE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Longest sanitized name in bytes, leaving room for the extension and
/// `.part` suffix under the usual 255-byte file name limit
pub const MAX_NAME_BYTES: usize = 200;

/// Builds a filesystem-safe name from a part identifier
///
/// Path-hostile characters and control characters become `-`; surrounding
/// whitespace and dots are trimmed, and the result is cut to
/// [`MAX_NAME_BYTES`] on a character boundary. An absent or empty identifier
/// falls back to `UnknownPart_<n>`, where `n` is the 1-based record position.
///
/// # Examples
///
/// ```
/// use datasheet_mirror::url::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier(Some("AB/12"), 0), "AB-12");
/// assert_eq!(sanitize_identifier(None, 4), "UnknownPart_5");
/// ```
pub fn sanitize_identifier(identifier: Option<&str>, index: usize) -> String {
    let cleaned: String = identifier
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if PATH_HOSTILE.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect();

    let cleaned = truncate_on_char_boundary(cleaned.trim().trim_matches('.').trim(), MAX_NAME_BYTES)
        .trim_end()
        .trim_end_matches('.')
        .trim_end();

    if cleaned.is_empty() {
        format!("UnknownPart_{}", index + 1)
    } else {
        cleaned.to_string()
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `<name>.<extension>`
pub fn artifact_file_name(name: &str, extension: &str) -> String {
    format!("{}.{}", name, extension)
}

/// Published location of an artifact under the mirror base
pub fn mirror_location(mirror_base: &str, file_name: &str) -> String {
    format!("{}{}", mirror_base, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slashes_replaced() {
        assert_eq!(sanitize_identifier(Some("AB/12"), 0), "AB-12");
        assert_eq!(sanitize_identifier(Some("A/B/C"), 0), "A-B-C");
        assert_eq!(sanitize_identifier(Some("X\\Y"), 0), "X-Y");
    }

    #[test]
    fn test_other_hostile_characters_replaced() {
        assert_eq!(sanitize_identifier(Some("a:b*c?d"), 0), "a-b-c-d");
        assert_eq!(sanitize_identifier(Some("<x>|\"y\""), 0), "-x---y-");
        assert_eq!(sanitize_identifier(Some("tab\there"), 0), "tab-here");
    }

    #[test]
    fn test_safe_identifier_unchanged() {
        assert_eq!(
            sanitize_identifier(Some("XC7A35T-1CPG236C"), 3),
            "XC7A35T-1CPG236C"
        );
    }

    #[test]
    fn test_missing_identifier_uses_position() {
        assert_eq!(sanitize_identifier(None, 0), "UnknownPart_1");
        assert_eq!(sanitize_identifier(None, 41), "UnknownPart_42");
    }

    #[test]
    fn test_blank_or_dot_identifier_uses_position() {
        assert_eq!(sanitize_identifier(Some("   "), 2), "UnknownPart_3");
        assert_eq!(sanitize_identifier(Some(".."), 2), "UnknownPart_3");
    }

    #[test]
    fn test_long_identifier_is_bounded() {
        let name = sanitize_identifier(Some(&"X".repeat(300)), 0);
        assert_eq!(name.len(), MAX_NAME_BYTES);

        let file = artifact_file_name(&name, "pdf");
        assert!(format!("{}.part", file).len() < 255);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 'é' is two bytes, so byte 200 falls inside a character
        let name = sanitize_identifier(Some(&format!("A{}", "é".repeat(150))), 0);
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.starts_with('A'));
        assert!(name.chars().skip(1).all(|c| c == 'é'));
    }

    #[test]
    fn test_truncation_does_not_leave_trailing_dot() {
        let id = format!("{}.{}", "Y".repeat(199), "Z".repeat(50));
        let name = sanitize_identifier(Some(&id), 0);
        assert_eq!(name, "Y".repeat(199));
    }

    #[test]
    fn test_artifact_and_mirror_names() {
        let file = artifact_file_name("AB-12", "pdf");
        assert_eq!(file, "AB-12.pdf");
        assert_eq!(
            mirror_location("https://bucket.example.com/rf/", &file),
            "https://bucket.example.com/rf/AB-12.pdf"
        );
    }
}
