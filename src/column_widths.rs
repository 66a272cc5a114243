use crate::canvas::FontFace;
use crate::error::ContextError;

/// Padding added to the widest text of every column.
pub const CELL_PADDING: f32 = 10.0;
/// The total width of a table whose columns could not be measured.
pub const DEFAULT_TABLE_WIDTH: f32 = 50.0;

/// The widths of the columns of a table, scaled to fill a target width.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWidths {
    /// The scaled width of every column.
    pub widths: Vec<f32>,
    /// The measured width of every column (padding included) before scaling.
    pub natural_widths: Vec<f32>,
    /// The factor which maps the natural widths onto the scaled ones.
    pub scale: f32,
    /// The total width of the table.
    pub total_width: f32,
}

impl ColumnWidths {
    /// The result of a failed measurement: no widths and a narrow default total width.
    pub fn fallback() -> Self {
        ColumnWidths {
            widths: Vec::new(),
            natural_widths: Vec::new(),
            scale: 1.0,
            total_width: DEFAULT_TABLE_WIDTH,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.widths.is_empty()
    }

    /// The widths to draw a table of `column_count` columns with: the solved widths, or the
    /// default total width split equally when the measurement failed.
    pub fn for_columns(&self, column_count: usize) -> Vec<f32> {
        if !self.is_fallback() && self.widths.len() == column_count {
            return self.widths.clone();
        }
        if column_count == 0 {
            return Vec::new();
        }
        vec![self.total_width / column_count as f32; column_count]
    }
}

/// Computes the column widths of a grid of display strings so that the table spans `target_width`.
///
/// Each column is as wide as its widest text (the widest line, for multi-line cells) plus
/// `CELL_PADDING`, then all columns are scaled by the same factor, which keeps their proportions.
/// Rows shorter than the first one count their missing cells as empty.
///
/// This function does not fail: an empty grid, a non-positive target width or a failed
/// measurement yield `ColumnWidths::fallback()`.
pub fn solve_column_widths<M>(
    grid: &[Vec<String>],
    measure: M,
    font: FontFace,
    font_size: f32,
    target_width: f32,
) -> ColumnWidths
where
    M: Fn(&str, FontFace, f32) -> Result<f32, ContextError>,
{
    match try_solve_column_widths(grid, measure, font, font_size, target_width) {
        Ok(column_widths) => column_widths,
        Err(error) => {
            log::error!("Error calculating column widths: {}", error);
            ColumnWidths::fallback()
        }
    }
}

fn try_solve_column_widths<M>(
    grid: &[Vec<String>],
    measure: M,
    font: FontFace,
    font_size: f32,
    target_width: f32,
) -> Result<ColumnWidths, ContextError>
where
    M: Fn(&str, FontFace, f32) -> Result<f32, ContextError>,
{
    let column_count = grid.first().map(Vec::len).unwrap_or(0);
    if column_count == 0 {
        return Err(ContextError::with_context("The table has no cells to measure"));
    }
    if !(target_width.is_finite() && target_width > 0.0) {
        return Err(ContextError::with_context(format!(
            "The target width {} is not a positive width",
            target_width
        )));
    }

    let mut natural_widths = Vec::with_capacity(column_count);
    for column_index in 0..column_count {
        let mut widest = 0.0_f32;
        for row in grid {
            let text = row.get(column_index).map(String::as_str).unwrap_or("");
            for line in text.split('\n') {
                widest = widest.max(measure(line, font, font_size)?);
            }
        }
        natural_widths.push(widest + CELL_PADDING);
    }

    let natural_total_width: f32 = natural_widths.iter().sum();
    let scale = target_width / natural_total_width;
    if !scale.is_finite() {
        return Err(ContextError::with_context(format!(
            "Unable to scale a natural width of {} to {}",
            natural_total_width, target_width
        )));
    }
    let widths = natural_widths.iter().map(|width| width * scale).collect();

    Ok(ColumnWidths {
        widths,
        natural_widths,
        scale,
        total_width: target_width,
    })
}
