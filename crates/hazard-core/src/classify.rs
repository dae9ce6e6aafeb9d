//! Severity classification for raw crime records.

use crate::models::Severity;

/// Crime-type keywords checked in order; the first hit decides the severity.
const KEYWORD_RULES: &[(&str, Severity)] = &[
    ("HOMICIDE", Severity::High),
    ("ROBBERY", Severity::High),
    ("ASSAULT", Severity::High),
    ("BATTERY", Severity::High),
    ("KIDNAPPING", Severity::High),
    ("SEXUAL", Severity::High),
    ("BURGLARY", Severity::Medium),
    ("THEFT", Severity::Medium),
    ("CRIMINAL DAMAGE", Severity::Low),
];

/// Derive a severity from a record's primary type and flags.
///
/// Keyword matches are case-insensitive substrings. Records that match no
/// keyword are `Medium` when domestic, `Low` when an arrest was made, and
/// `Medium` otherwise.
pub fn classify_crime(primary_type: &str, arrest: bool, domestic: bool) -> Severity {
    let upper = primary_type.to_ascii_uppercase();
    if let Some((_, severity)) = KEYWORD_RULES
        .iter()
        .find(|(keyword, _)| upper.contains(keyword))
    {
        return *severity;
    }

    if domestic {
        Severity::Medium
    } else if arrest {
        Severity::Low
    } else {
        Severity::Medium
    }
}
