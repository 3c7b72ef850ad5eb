//! Display and processing order for stems.
//!
//! Vocals first, then a fixed priority table, then unknown types in their
//! original relative order.

/// Non-vocal stem types in display order.
pub const TYPE_PRIORITY: [&str; 14] = [
    "instrumental",
    "drums",
    "bass",
    "guitar",
    "piano",
    "keyboard",
    "synth",
    "strings",
    "brass",
    "woodwinds",
    "percussion",
    "fx",
    "atmosphere",
    "other",
];

/// Any type containing "vocal", or exactly "voice", case-insensitive.
pub fn is_vocal_type(stem_type: &str) -> bool {
    let lower = stem_type.to_ascii_lowercase();
    lower.contains("vocal") || lower == "voice"
}

/// Sort rank: 0 for vocals, table position + 1 for known types, and one past
/// the table for everything else.
pub fn type_rank(stem_type: &str) -> usize {
    if is_vocal_type(stem_type) {
        return 0;
    }
    TYPE_PRIORITY
        .iter()
        .position(|t| t.eq_ignore_ascii_case(stem_type))
        .map_or(TYPE_PRIORITY.len() + 1, |i| i + 1)
}

/// Stable in-place sort by stem type rank.
pub fn sort_by_type<T>(items: &mut [T], stem_type: impl Fn(&T) -> &str) {
    items.sort_by_key(|item| type_rank(stem_type(item)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocal_detection() {
        assert!(is_vocal_type("vocals"));
        assert!(is_vocal_type("Lead_Vocal"));
        assert!(is_vocal_type("VOICE"));
        assert!(!is_vocal_type("voiceover"));
        assert!(!is_vocal_type("drums"));
    }

    #[test]
    fn test_vocals_first_then_table() {
        let mut types = vec!["drums", "vocals", "bass", "lead_vocal", "guitar"];
        sort_by_type(&mut types, |t| *t);
        assert_eq!(types, vec!["vocals", "lead_vocal", "drums", "bass", "guitar"]);
    }

    #[test]
    fn test_unknown_types_last_and_stable() {
        let mut types = vec!["zither", "other", "kazoo", "Piano", "backing_vocals"];
        sort_by_type(&mut types, |t| *t);
        assert_eq!(types, vec!["backing_vocals", "Piano", "other", "zither", "kazoo"]);
    }
}
