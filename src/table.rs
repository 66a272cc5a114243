use crate::canvas::{Alignment, Canvas, Color, FontFace, Paint, Rectangle};
use crate::error::ContextError;

/// Space between the top of a cell and its first line of text.
pub const TOP_PADDING: f32 = 3.0;
/// Space between the last line of text of a cell and its bottom.
pub const BOTTOM_PADDING: f32 = 5.0;
/// Space between the vertical borders of a cell and its text.
pub const HORIZONTAL_PADDING: f32 = 6.0;
/// Line height as a multiple of the font size.
pub const LEADING_FACTOR: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStyle {
    pub font: FontFace,
    pub font_size: f32,
    pub alignment: Alignment,
    pub background: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub style: CellStyle,
}

impl TableCell {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    fn leading(&self) -> f32 {
        self.style.font_size * LEADING_FACTOR
    }

    /// The height the text of the cell needs, paddings included.
    pub fn height(&self) -> f32 {
        self.lines().count() as f32 * self.leading() + TOP_PADDING + BOTTOM_PADDING
    }
}

/// A grid of styled cells with fixed column widths, drawn with a border around every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<TableCell>>,
    pub column_widths: Vec<f32>,
    pub grid_line_width: f32,
}

impl Table {
    /// Builds a table from the text of its cells, the style of each cell being decided by its position.
    pub fn from_grid<S>(grid: &[Vec<String>], column_widths: Vec<f32>, style: S) -> Self
    where
        S: Fn(usize, usize) -> CellStyle,
    {
        let rows = grid
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                row.iter()
                    .enumerate()
                    .map(|(column_index, text)| TableCell {
                        text: text.clone(),
                        style: style(row_index, column_index),
                    })
                    .collect()
            })
            .collect();

        Table {
            rows,
            column_widths,
            grid_line_width: 1.5,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_height(&self, row_index: usize) -> f32 {
        self.rows
            .get(row_index)
            .map(|row| row.iter().map(TableCell::height).fold(0.0, f32::max))
            .unwrap_or(0.0)
    }

    pub fn height(&self) -> f32 {
        (0..self.rows.len()).map(|row_index| self.row_height(row_index)).sum()
    }

    pub fn width(&self) -> f32 {
        self.column_widths.iter().sum()
    }
}

/// Draws the table with its upper-left corner at `top_left`: first the cell backgrounds,
/// then the text vertically centered in each cell, and the grid lines last.
pub fn draw_table<C: Canvas + ?Sized>(
    canvas: &mut C,
    table: &Table,
    top_left: [f32; 2],
) -> Result<(), ContextError> {
    if let Some((row_index, row)) = table
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != table.column_widths.len())
    {
        return Err(ContextError::with_context(format!(
            "The row {} has {} cells but the table has {} column widths",
            row_index,
            row.len(),
            table.column_widths.len()
        )));
    }

    let [left, top] = top_left;
    let mut cells = Vec::new();
    let mut row_top = top;
    for (row_index, row) in table.rows.iter().enumerate() {
        let row_height = table.row_height(row_index);
        let mut cell_left = left;
        for (cell, width) in row.iter().zip(&table.column_widths) {
            let bounds = Rectangle::new(cell_left, row_top - row_height, *width, row_height);
            cells.push((cell, bounds));
            cell_left += width;
        }
        row_top -= row_height;
    }

    for (cell, bounds) in &cells {
        if let Some(color) = cell.style.background {
            canvas.draw_rectangle(*bounds, Paint::Fill { color })?;
        }
    }

    for (cell, bounds) in &cells {
        draw_cell_text(canvas, cell, bounds)?;
    }

    for (_, bounds) in &cells {
        canvas.draw_rectangle(
            *bounds,
            Paint::Stroke {
                line_width: table.grid_line_width,
            },
        )?;
    }

    Ok(())
}

fn draw_cell_text<C: Canvas + ?Sized>(
    canvas: &mut C,
    cell: &TableCell,
    bounds: &Rectangle,
) -> Result<(), ContextError> {
    let leading = cell.leading();
    let line_count = cell.lines().count() as f32;
    let content_top = bounds.y + bounds.height - TOP_PADDING;
    let content_bottom = bounds.y + BOTTOM_PADDING;
    let block_top = content_top - ((content_top - content_bottom) - line_count * leading) / 2.0;

    let anchor_x = match cell.style.alignment {
        Alignment::Left => bounds.x + HORIZONTAL_PADDING,
        Alignment::Center => bounds.x + bounds.width / 2.0,
        Alignment::Right => bounds.x + bounds.width - HORIZONTAL_PADDING,
    };

    for (index, line) in cell.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let baseline = block_top - cell.style.font_size - index as f32 * leading;
        canvas.draw_aligned_text(
            line,
            cell.style.font,
            cell.style.font_size,
            [anchor_x, baseline],
            cell.style.alignment,
        )?;
    }

    Ok(())
}
