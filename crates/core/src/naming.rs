//! Name sanitization and storage key derivation.
//!
//! Keys are derived only from manifest data and resolution metadata, so
//! running the same manifest twice writes the same keys.

/// Characters removed from every key component.
pub const FORBIDDEN_CHARS: &[char] = &[
    '/', '\\', '#', '?', '%', '&', '{', '}', '<', '>', '*', ':', '|', '"', '^', '~', '[', ']',
    '`',
];

/// Group name used when a group sanitizes to nothing.
pub const FALLBACK_GROUP: &str = "ungrouped";

/// Sanitizes one key component.
///
/// Removes [`FORBIDDEN_CHARS`] and control characters, then trims whitespace.
/// The result may be empty. `sanitize(sanitize(s)) == sanitize(s)` for any `s`.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .collect();
    cleaned.trim().to_string()
}

/// Sanitizes a filename, falling back to `fallback` when nothing survives.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let cleaned = sanitize(name);
    if cleaned.is_empty() {
        sanitize(fallback)
    } else {
        cleaned
    }
}

/// Returns the lowercase extension of a filename or URL path, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    let last = name.rsplit('/').next().unwrap_or(name);
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Builds `<group>[/<crumb>...]/<filename>` from raw parts.
///
/// Every part is sanitized; empty breadcrumb segments are dropped. An empty
/// filename is replaced by the 1-based `index` plus `extension`.
pub fn storage_key(
    group: &str,
    breadcrumbs: &[String],
    filename: &str,
    index: usize,
    extension: Option<&str>,
) -> String {
    let group = sanitize_filename(group, FALLBACK_GROUP);

    let mut crumbs: Vec<String> = breadcrumbs
        .iter()
        .map(|c| sanitize(c))
        .filter(|c| !c.is_empty())
        .collect();
    // A trail starting at the group itself would repeat it.
    if crumbs.first() == Some(&group) {
        crumbs.remove(0);
    }

    let mut parts = vec![group];
    parts.extend(crumbs);

    let fallback = match extension {
        Some(ext) => format!("{}.{}", index, ext),
        None => index.to_string(),
    };
    parts.push(sanitize_filename(filename, &fallback));

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_forbidden() {
        assert_eq!(sanitize("a/b\\c#d?e%f&g"), "abcdefg");
        assert_eq!(sanitize("{x}<y>*z:|\"^~[]`"), "xyz");
    }

    #[test]
    fn test_sanitize_trims_whitespace() {
        assert_eq!(sanitize("  Lecture 1  "), "Lecture 1");
        assert_eq!(sanitize(" / "), "");
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize("a\tb\nc\u{0}"), "abc");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "",
            "   ",
            "plain",
            " leading and trailing ",
            "Cours: Anatomie / Partie [1]",
            "\t/\u{7}  x  \\\n",
            "100% *done*?",
            "élève ~ «ç» | ü",
            "a /  / b",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
            assert!(!once.chars().any(|c| FORBIDDEN_CHARS.contains(&c)));
        }
    }

    #[test]
    fn test_sanitize_filename_fallback() {
        assert_eq!(sanitize_filename("???", "video.mp4"), "video.mp4");
        assert_eq!(sanitize_filename("talk.mp4", "video.mp4"), "talk.mp4");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/files/Slides.PPTX"), Some("pptx".to_string()));
        assert_eq!(extension_of("notes"), None);
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("/a.b/c"), None);
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
    }

    #[test]
    fn test_storage_key_layout() {
        assert_eq!(
            storage_key("Math", &[], "Math 1.mp4", 1, Some("mp4")),
            "Math/Math 1.mp4"
        );
        assert_eq!(
            storage_key(
                "Bio: L1",
                &["Semestre 1".to_string(), " ".to_string(), "UE/2".to_string()],
                "cours?.pdf",
                3,
                Some("pdf")
            ),
            "Bio L1/Semestre 1/UE2/cours.pdf"
        );
    }

    #[test]
    fn test_storage_key_drops_crumb_matching_group() {
        let crumbs = vec!["Algebra:".to_string(), "Week 1".to_string()];
        assert_eq!(
            storage_key("Algebra", &crumbs, "Lecture 1.mp4", 1, Some("mp4")),
            "Algebra/Week 1/Lecture 1.mp4"
        );
        // Only a leading match is dropped.
        let crumbs = vec!["Week 1".to_string(), "Algebra".to_string()];
        assert_eq!(
            storage_key("Algebra", &crumbs, "x.pdf", 1, Some("pdf")),
            "Algebra/Week 1/Algebra/x.pdf"
        );
    }

    #[test]
    fn test_storage_key_index_fallback() {
        assert_eq!(storage_key("", &[], "///", 4, Some("pdf")), "ungrouped/4.pdf");
        assert_eq!(storage_key("G", &[], "", 2, None), "G/2");
    }
}
