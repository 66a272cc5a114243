use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::table::{self, Table};

/// An RGB color whose components range from zero to one.
pub type Color = [f32; 3];

pub const BLACK: Color = [0.0, 0.0, 0.0];
pub const WHITE: Color = [1.0, 1.0, 1.0];
pub const WHITE_SMOKE: Color = [0.96, 0.96, 0.96];

/// The fonts an invoice is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontFace {
    /// The regular face of the text font, used for the values.
    Regular,
    /// The bold face of the text font, used for labels and table headers.
    Bold,
    /// The serif font of the payment details labels.
    Serif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// The anchor is where the text starts.
    Left,
    /// The anchor is the middle of the text.
    Center,
    /// The anchor is where the text ends.
    Right,
}

/// An axis-aligned rectangle, with `[x, y]` its lower-left corner in points.
/// A negative width or height extends the rectangle to the left or downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }
}

/// How a rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    /// Only the outline, with the given line width.
    Stroke { line_width: f32 },
    /// Only the inside, with the given color.
    Fill { color: Color },
}

/// The drawing service an invoice is rendered onto. Coordinates are in points, with the
/// origin at the lower-left corner of the page content.
///
/// The PDF implementation is `PdfDocument`, tests record the calls instead.
pub trait Canvas {
    /// The width in points of the text when drawn with the given font and size.
    fn measure_text(&self, text: &str, font: FontFace, font_size: f32) -> Result<f32, ContextError>;

    /// Draws the text with its baseline starting at the given position.
    fn draw_text(
        &mut self,
        text: &str,
        font: FontFace,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), ContextError>;

    fn draw_rectangle(&mut self, rectangle: Rectangle, paint: Paint) -> Result<(), ContextError>;

    /// Draws the text so that the anchor is at its start, middle or end.
    fn draw_aligned_text(
        &mut self,
        text: &str,
        font: FontFace,
        font_size: f32,
        anchor: [f32; 2],
        alignment: Alignment,
    ) -> Result<(), ContextError> {
        let [x, y] = anchor;
        let x = match alignment {
            Alignment::Left => x,
            Alignment::Center => x - self.measure_text(text, font, font_size)? / 2.0,
            Alignment::Right => x - self.measure_text(text, font, font_size)?,
        };
        self.draw_text(text, font, font_size, [x, y])
    }

    /// Draws the lines one below the other, the first baseline at the given position.
    fn draw_lines(
        &mut self,
        lines: &[String],
        font: FontFace,
        font_size: f32,
        position: [f32; 2],
        leading: f32,
    ) -> Result<(), ContextError> {
        let [x, y] = position;
        for (index, line) in lines.iter().enumerate() {
            self.draw_text(line, font, font_size, [x, y - index as f32 * leading])?;
        }
        Ok(())
    }

    /// Draws the table with its upper-left corner at the given position.
    fn draw_table(&mut self, table: &Table, top_left: [f32; 2]) -> Result<(), ContextError> {
        table::draw_table(self, table, top_left)
    }
}

/// Breaks the text into lines no wider than `maximum_width`, breaking between words.
/// Explicit newlines are kept, and a single word wider than the limit gets a line of its own.
pub fn wrap_text<M>(text: &str, maximum_width: f32, measure: M) -> Result<Vec<String>, ContextError>
where
    M: Fn(&str) -> Result<f32, ContextError>,
{
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            if current_line.is_empty() {
                current_line.push_str(word);
                continue;
            }
            let candidate = format!("{current_line} {word}");
            if measure(&candidate)? <= maximum_width {
                current_line = candidate;
            } else {
                lines.push(std::mem::replace(&mut current_line, word.to_string()));
            }
        }
        lines.push(current_line);
    }

    Ok(lines)
}
