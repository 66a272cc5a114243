use unicode_bidi::BidiInfo;
use unicode_normalization::UnicodeNormalization as _;

/// Turns raw (logical order) text into the text to be drawn, glyph after glyph from left to right.
///
/// Every string reaching the canvas goes through a shaper first, which is what makes
/// right-to-left scripts come out readable.
pub trait TextShaper {
    fn shape(&self, text: &str) -> String;
}

/// Leaves the order of the characters untouched, only composing them (NFC).
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicalOrder;

impl TextShaper for LogicalOrder {
    fn shape(&self, text: &str) -> String {
        text.nfc().collect()
    }
}

/// Shapes Arabic letters into their contextual presentation forms, then reorders every line
/// for display with the Unicode bidirectional algorithm (UAX #9).
///
/// The PDF text is written glyph by glyph without any OpenType substitution, so the joined
/// forms have to be chosen here. The direction of a line is the one of its first strong
/// character, and the brackets of right-to-left runs are mirrored.
#[derive(Debug, Clone, Copy, Default)]
pub struct BidiShaper;

impl TextShaper for BidiShaper {
    fn shape(&self, text: &str) -> String {
        text.nfc()
            .collect::<String>()
            .split('\n')
            .map(display_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn display_line(line: &str) -> String {
    if line.is_empty() {
        return String::new();
    }
    let reshaped = ar_reshaper::reshape_line(line);
    let bidi_info = BidiInfo::new(&reshaped, None);
    let Some(paragraph) = bidi_info.paragraphs.first() else {
        return reshaped.clone();
    };

    let (levels, runs) = bidi_info.visual_runs(paragraph, paragraph.range.clone());
    let mut displayed = String::with_capacity(reshaped.len());
    for run in runs {
        let run_text = &reshaped[run.clone()];
        if levels[run.start].is_rtl() {
            displayed.extend(run_text.chars().rev().map(mirror));
        } else {
            displayed.push_str(run_text);
        }
    }
    displayed
}

fn mirror(character: char) -> char {
    match character {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        other => other,
    }
}
