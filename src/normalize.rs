/// The separator used between subjects and inside free-text fields of the spreadsheet.
pub const SEPARATOR: &str = " - ";

/// Canonicalizes a text field of the spreadsheet.
///
/// Whitespace runs collapse to a single space and the edges are trimmed. Then any
/// repetition of the `" - "` separator (as left behind by joining empty subjects) collapses
/// to a single one, and leading or trailing spaces and hyphens are stripped.
///
/// The function is idempotent: `normalize_space(&normalize_space(s)) == normalize_space(s)`.
pub fn normalize_space(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(segment);
    }

    let collapsed = collapse_separator_runs(&collapsed);
    collapsed
        .trim_matches(|character| character == ' ' || character == '-')
        .to_string()
}

/// Collapses `" - - "`, `" - - - "` and longer runs into a single `" - "`.
fn collapse_separator_runs(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(position) = rest.find(SEPARATOR) {
        result.push_str(&rest[..position]);
        result.push_str(SEPARATOR);
        rest = &rest[position + SEPARATOR.len()..];
        // Every further "- " directly after the separator belongs to the same run
        while let Some(stripped) = rest.strip_prefix("- ") {
            rest = stripped;
        }
    }
    result.push_str(rest);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(normalize_space("  Ahmed \t  Samir\n"), "Ahmed Samir");
        assert_eq!(normalize_space("\n\n"), "");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(normalize_space("Math - - - Physics"), "Math - Physics");
        assert_eq!(normalize_space(" - Math - - "), "Math");
        assert_eq!(normalize_space(" -  - Math -   - - Science - "), "Math - Science");
    }

    #[test]
    fn keeps_hyphenated_words() {
        assert_eq!(normalize_space("Al-Azhar  Street"), "Al-Azhar Street");
        assert_eq!(normalize_space("G5 - G6"), "G5 - G6");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "",
            "   ",
            " - ",
            "- - -",
            "Math -  - Arabic",
            "a-b - -c",
            "  --Math-- ",
            "مدرسة  - - القاهرة",
            "x - - - - - - - - y",
            "-a - - - b-",
        ];
        for sample in samples {
            let once = normalize_space(sample);
            assert_eq!(normalize_space(&once), once, "input {:?}", sample);
        }
    }
}
