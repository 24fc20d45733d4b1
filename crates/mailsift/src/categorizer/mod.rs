//! Attachment classification by filename extension.

use std::path::Path;

/// Category for anything the table does not know.
pub const DEFAULT_CATEGORY: &str = "another";

/// Extension (with the leading dot, lower case) to storage category.
const EXTENSION_CATEGORIES: &[(&str, &str)] = &[
    (".bin", "bins"),
    (".pdf", "pdf"),
    (".xlsx", "excel"),
    (".xls", "excel"),
    (".doc", "docs"),
    (".docx", "docs"),
    (".jpg", "jpg"),
    (".dbf", "dbf"),
    (".xml", "xml"),
];

/// Returns the extension of `filename` including the leading dot.
///
/// Only the last path component is considered. A name that is all
/// extension, like `.pdf`, still has one.
pub fn extension(filename: &str) -> Option<&str> {
    let name = Path::new(filename).file_name()?.to_str()?;
    let dot = name.rfind('.')?;
    Some(&name[dot..])
}

/// Maps a filename to its storage category. Never fails; unknown
/// extensions land in [`DEFAULT_CATEGORY`].
pub fn classify(filename: &str) -> &'static str {
    let Some(ext) = extension(filename) else {
        return DEFAULT_CATEGORY;
    };

    EXTENSION_CATEGORIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map_or(DEFAULT_CATEGORY, |&(_, category)| category)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (filename, expected category)
    const CASES: &[(&str, &str)] = &[
        ("firmware.bin", "bins"),
        ("invoice.pdf", "pdf"),
        ("report.PDF", "pdf"),
        ("budget.xlsx", "excel"),
        ("budget-2003.xls", "excel"),
        ("letter.doc", "docs"),
        ("letter.docx", "docs"),
        ("photo.jpg", "jpg"),
        ("photo.jpeg", "another"),
        ("table.dbf", "dbf"),
        ("data.xml", "xml"),
        ("archive.zip", "another"),
        ("archive.tar.gz", "another"),
        ("backup.pdf.zip", "another"),
        ("README", "another"),
        (".pdf", "pdf"),
        (".profile", "another"),
        ("", "another"),
        ("trailing.", "another"),
        ("Отчёт.xlsx", "excel"),
    ];

    #[test]
    fn test_classification_table() {
        for (filename, expected) in CASES {
            assert_eq!(classify(filename), *expected, "filename {:?}", filename);
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        for (filename, _) in CASES {
            assert_eq!(classify(filename), classify(filename));
        }
    }

    #[test]
    fn test_every_result_is_a_known_category() {
        for (filename, _) in CASES {
            let category = classify(filename);
            assert!(
                category == DEFAULT_CATEGORY
                    || EXTENSION_CATEGORIES.iter().any(|&(_, c)| c == category),
                "unexpected category {:?}",
                category
            );
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("a.pdf"), Some(".pdf"));
        assert_eq!(extension("a.b.PDF"), Some(".PDF"));
        assert_eq!(extension("dir.d/file"), None);
        assert_eq!(extension(".pdf"), Some(".pdf"));
        assert_eq!(extension("trailing."), Some("."));
        assert_eq!(extension("noext"), None);
    }
}
