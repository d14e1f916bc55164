//! Built-in field patterns.
//!
//! Regexes used to check free-text fields that must follow a fixed format,
//! and to normalize names.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// A compiled field pattern.
#[derive(Debug)]
pub struct FieldPattern {
    /// Name of the pattern for identification.
    pub name: &'static str,

    /// Description of the accepted format, shown in error messages.
    pub description: &'static str,

    regex: Regex,
}

impl FieldPattern {
    /// Create a new field pattern.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid.
    #[must_use]
    pub fn new(name: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            name,
            description,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Check if the whole value matches this pattern.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// Replace every match in `value` with `with`.
    #[must_use]
    pub fn replace_all<'a>(&self, value: &'a str, with: &str) -> Cow<'a, str> {
        self.regex.replace_all(value, with)
    }
}

/// Process display colors, `#RRGGBB`.
pub fn color() -> &'static FieldPattern {
    static PATTERN: OnceLock<FieldPattern> = OnceLock::new();
    PATTERN.get_or_init(|| FieldPattern::new("color", "#RRGGBB", r"^#[0-9A-Fa-f]{6}$"))
}

/// Calendar dates, `YYYY-MM-DD`.
pub fn date() -> &'static FieldPattern {
    static PATTERN: OnceLock<FieldPattern> = OnceLock::new();
    PATTERN.get_or_init(|| {
        FieldPattern::new(
            "date",
            "YYYY-MM-DD",
            r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$",
        )
    })
}

/// Runs of whitespace, collapsed in export file names.
pub fn whitespace() -> &'static FieldPattern {
    static PATTERN: OnceLock<FieldPattern> = OnceLock::new();
    PATTERN.get_or_init(|| FieldPattern::new("whitespace", "whitespace run", r"\s+"))
}
