use serde::{Deserialize, Serialize};

use crate::canvas::{
    wrap_text, Alignment, Canvas, FontFace, Paint, Rectangle, WHITE, WHITE_SMOKE,
};
use crate::column_widths::solve_column_widths;
use crate::configuration::InvoiceConfiguration;
use crate::consolidate::TutorInvoiceRecord;
use crate::error::ContextError;
use crate::session::format_number;
use crate::shaping::TextShaper;
use crate::table::{CellStyle, Table, HORIZONTAL_PADDING};

/// Width of the content area of a page (A4), in points.
pub const PAGE_WIDTH: f32 = 595.2756;
/// Height of the content area of a page (A4), in points.
pub const PAGE_HEIGHT: f32 = 841.8898;
/// The blank border added around the content area on every side.
pub const PAGE_MARGIN: f32 = 10.0;
/// Distance between the tables and the left and right edges of the content area.
pub const TABLE_MARGIN: f32 = 25.0;
/// Distance from the top of the content area to the top of the line-item table.
pub const HEADER_HEIGHT: f32 = 305.0;
/// The height assumed for every line-item row when the table could not be laid out.
pub const ROW_STEP: f32 = 20.0;
/// Vertical space between the line-item table and the payment-details table.
pub const PAYMENT_GAP: f32 = 30.0;

const LABEL_FONT_SIZE: f32 = 10.0;
const VALUE_FONT_SIZE: f32 = 9.0;
const SMALL_FONT_SIZE: f32 = 7.0;
const BOX_LINE_WIDTH: f32 = 1.5;
/// Left edge of the header boxes.
const BOX_X: f32 = 25.0;
/// Bottom edge of the first header box.
const BOX_Y: f32 = PAGE_HEIGHT - 70.0;
const BOX_WIDTH: f32 = PAGE_WIDTH / 2.0 - 30.0;
const BOX_HEIGHT: f32 = 20.0;
/// Distance from the bottom of a box to the baseline of its value.
const BOX_TEXT_RISE: f32 = 6.25;
const SMALL_BOX_WIDTH: f32 = 115.0;
const SMALL_BOX_HEIGHT: f32 = 15.0;
const ADDRESS_LINES: usize = 2;
const FOR_LINES: usize = 3;
/// Share of the content width taken by the labels of the payment-details table.
const PAYMENT_LABEL_SHARE: f32 = 0.2;

/// The parts of an invoice page, each drawn (or failing) on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    /// The title and the boxes with the tutor's profile and the invoice identification.
    Header,
    /// The rows of the line-item table.
    LineItems,
    /// The column widths and the drawing of the line-item table.
    LineItemLayout,
    /// The bank details table below the line items.
    PaymentDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOutcome {
    pub section: Section,
    /// Why the section has been left out of the page, if it has.
    pub error: Option<ContextError>,
}

/// What has been drawn of the invoice of a tutor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub tutor_id: String,
    pub outcomes: Vec<SectionOutcome>,
}

impl RenderReport {
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.error.is_none())
    }

    pub fn failed_sections(&self) -> Vec<Section> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.error.is_some())
            .map(|outcome| outcome.section)
            .collect()
    }

    fn record<T>(&mut self, section: Section, result: Result<T, ContextError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.outcomes.push(SectionOutcome {
                    section,
                    error: None,
                });
                Some(value)
            }
            Err(error) => {
                log::error!(
                    "Unable to draw the {:?} section of the invoice of the tutor {}: {}",
                    section,
                    self.tutor_id,
                    error
                );
                self.outcomes.push(SectionOutcome {
                    section,
                    error: Some(error),
                });
                None
            }
        }
    }
}

/// Draws the invoice of a consolidated record onto one page of a canvas.
pub struct InvoiceRenderer {
    currency_label: String,
    recipient_lines: Vec<String>,
    payment_method: String,
    shaper: Box<dyn TextShaper>,
}

impl InvoiceRenderer {
    pub fn new(configuration: &InvoiceConfiguration, shaper: Box<dyn TextShaper>) -> Self {
        InvoiceRenderer {
            currency_label: configuration.currency_label.clone(),
            recipient_lines: configuration.recipient_lines.clone(),
            payment_method: configuration.payment_method.clone(),
            shaper,
        }
    }

    /// Draws the page of the invoice, expecting the canvas to be on a fresh page whose
    /// origin is the lower-left corner of the content area.
    ///
    /// Sections are drawn independently: a failed section is logged and left out of the page
    /// while the others are still drawn, and the report tells which sections made it.
    pub fn render<C: Canvas + ?Sized>(
        &self,
        record: &TutorInvoiceRecord,
        canvas: &mut C,
    ) -> RenderReport {
        let mut report = RenderReport {
            tutor_id: record.id.clone(),
            outcomes: Vec::new(),
        };

        let header = draw_section(canvas, |buffer| self.draw_header(record, buffer));
        report.record(Section::Header, header);

        let grid = report.record(Section::LineItems, Ok(self.shaped(self.line_item_rows(record))));
        let grid_row_count = grid.as_ref().map(Vec::len).unwrap_or(0);

        let layout = match grid {
            Some(grid) => draw_section(canvas, |buffer| self.draw_line_items(&grid, buffer)),
            None => Err(ContextError::with_context("The line items are not available")),
        };
        let line_items_height = report
            .record(Section::LineItemLayout, layout)
            .unwrap_or(grid_row_count as f32 * ROW_STEP);

        let line_items_bottom = PAGE_HEIGHT - HEADER_HEIGHT - line_items_height;
        let payment_details = draw_section(canvas, |buffer| {
            self.draw_payment_details(record, line_items_bottom, buffer)
        });
        report.record(Section::PaymentDetails, payment_details);

        report
    }

    /// The rows of the line-item table, header row included: one row per subject and grade
    /// followed by the fixed compensation, special tasks, CRM, demo and total rows.
    pub fn line_item_rows(&self, record: &TutorInvoiceRecord) -> Vec<Vec<String>> {
        let currency = &self.currency_label;
        let money = |amount: i64| format!("{currency} {amount}");

        let mut rows = vec![vec![
            "Description".to_string(),
            "Amount".to_string(),
            format!("Rate\n({currency})"),
            format!("Total\n({currency})"),
        ]];

        rows.extend(record.subject_grades.iter().map(|pair| {
            vec![
                pair.description.clone(),
                format_number(pair.total_sessions),
                money(pair.session_price),
                money(pair.total_sessions_price),
            ]
        }));

        rows.extend([
            vec![
                "Compensation".to_string(),
                "--".to_string(),
                "--".to_string(),
                money(record.total_compensation),
            ],
            vec![
                "Content Special Tasks".to_string(),
                format_number(record.content_special_tasks),
                money(record.content_special_tasks_price),
                money(record.content_special_tasks_total),
            ],
            vec![
                "CRM".to_string(),
                format!("{} hr", format_number(record.crm_duration)),
                money(record.crm_price),
                money(record.crm_payment),
            ],
            vec![
                format!("Demo {}", record.demo_month).trim_end().to_string(),
                format_number(record.demo_count),
                money(record.demo_price),
                money(record.demo_total),
            ],
            vec![
                "Total".to_string(),
                "--".to_string(),
                "--".to_string(),
                money(record.total_salary),
            ],
        ]);

        rows
    }

    /// The rows of the payment-details table, a label and a value each.
    pub fn payment_rows(&self, record: &TutorInvoiceRecord) -> Vec<[String; 2]> {
        vec![
            ["Account Name".into(), record.bank_account_name.clone()],
            ["Bank Name".into(), record.bank_name.clone()],
            ["Bank Address".into(), record.bank_address.clone()],
            [
                "□ Account Number\n□ IBAN\n(Tick which it is)".into(),
                format!("{}\n{}\n", record.account_number, record.iban),
            ],
            [
                "□ Swift\n□ BIC\n□ Routing Number\n□ Sort Code\n(Tick which it is)".into(),
                format!("{}\n\n\n\n", record.swift),
            ],
            ["Account Type".into(), self.currency_label.clone()],
            ["Payment Method".into(), self.payment_method.clone()],
        ]
    }

    fn shaped(&self, rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
        rows.into_iter()
            .map(|row| row.iter().map(|cell| self.shaper.shape(cell)).collect())
            .collect()
    }

    /// Wraps the text to the width in logical order, then shapes every resulting line.
    fn shaped_paragraph<C: Canvas + ?Sized>(
        &self,
        canvas: &C,
        text: &str,
        font_size: f32,
        maximum_width: f32,
    ) -> Result<Vec<String>, ContextError> {
        let lines = wrap_text(text, maximum_width, |candidate| {
            canvas.measure_text(&self.shaper.shape(candidate), FontFace::Regular, font_size)
        })?;
        Ok(lines.iter().map(|line| self.shaper.shape(line)).collect())
    }

    fn draw_header<C: Canvas + ?Sized>(
        &self,
        record: &TutorInvoiceRecord,
        canvas: &mut C,
    ) -> Result<(), ContextError> {
        let stroke = Paint::Stroke {
            line_width: BOX_LINE_WIDTH,
        };
        canvas.draw_text("Invoice", FontFace::Bold, 12.0, [25.0, PAGE_HEIGHT - 25.0])?;

        // Name, mobile number and email address: a label above a one-line box
        for (label, value, offset) in [
            ("Name:", &record.full_name, 0.0),
            ("Mobile Number:", &record.mobile, 100.0),
            ("Email Address:", &record.email_address, 145.0),
        ] {
            canvas.draw_text(label, FontFace::Bold, LABEL_FONT_SIZE, [30.0, PAGE_HEIGHT - 45.0 - offset])?;
            canvas.draw_rectangle(Rectangle::new(BOX_X, BOX_Y - offset, BOX_WIDTH, BOX_HEIGHT), stroke)?;
            canvas.draw_text(
                &self.shaper.shape(value),
                FontFace::Regular,
                VALUE_FONT_SIZE,
                [BOX_X + 5.0, BOX_Y - offset + BOX_TEXT_RISE],
            )?;
        }

        // Address: a taller box holding a wrapped paragraph
        let address_box = Rectangle::new(BOX_X, BOX_Y - 55.0, BOX_WIDTH, BOX_HEIGHT + 10.0);
        canvas.draw_text("Address:", FontFace::Bold, LABEL_FONT_SIZE, [30.0, PAGE_HEIGHT - 90.0])?;
        canvas.draw_rectangle(address_box, stroke)?;
        let address_lines = fitting_lines(
            self.shaped_paragraph(canvas, &record.address, VALUE_FONT_SIZE, BOX_WIDTH - 10.0)?,
            ADDRESS_LINES,
            "address",
            &record.id,
        );
        canvas.draw_lines(
            &address_lines,
            FontFace::Regular,
            VALUE_FONT_SIZE,
            [BOX_X + 5.0, address_box.y + address_box.height - 10.0],
            11.0,
        )?;

        // To: the fixed recipient, For: the subjects and the accrual month
        let bottom_boxes_y = BOX_Y - 190.0 - 30.0;
        let first_line_y = BOX_Y - 190.0 + BOX_TEXT_RISE;
        canvas.draw_text("To:", FontFace::Bold, LABEL_FONT_SIZE, [30.0, PAGE_HEIGHT - 235.0])?;
        canvas.draw_rectangle(
            Rectangle::new(BOX_X, bottom_boxes_y, BOX_WIDTH, BOX_HEIGHT + 30.0),
            stroke,
        )?;
        let recipient_lines: Vec<String> = self
            .recipient_lines
            .iter()
            .map(|line| self.shaper.shape(line))
            .collect();
        canvas.draw_lines(
            &recipient_lines,
            FontFace::Regular,
            VALUE_FONT_SIZE,
            [BOX_X + 5.0, first_line_y],
            15.0,
        )?;

        let for_box_x = PAGE_WIDTH - BOX_X - BOX_WIDTH;
        canvas.draw_text(
            "For:",
            FontFace::Bold,
            LABEL_FONT_SIZE,
            [PAGE_WIDTH / 2.0 + 10.0, PAGE_HEIGHT - 235.0],
        )?;
        canvas.draw_rectangle(
            Rectangle::new(for_box_x, bottom_boxes_y, BOX_WIDTH, BOX_HEIGHT + 30.0),
            stroke,
        )?;
        let mut for_lines =
            self.shaped_paragraph(canvas, &record.subjects, VALUE_FONT_SIZE, BOX_WIDTH - 10.0)?;
        for_lines.push(self.shaper.shape(&record.accrual_month));
        let for_lines = fitting_lines(for_lines, FOR_LINES, "subjects", &record.id);
        canvas.draw_lines(
            &for_lines,
            FontFace::Regular,
            VALUE_FONT_SIZE,
            [for_box_x + 5.0, first_line_y],
            14.0,
        )?;

        // Invoice number and date: small boxes in the upper-right corner
        let small_box_x = PAGE_WIDTH - BOX_X - 5.0 - SMALL_BOX_WIDTH;
        let small_box_center = small_box_x + SMALL_BOX_WIDTH / 2.0;
        for (label, value, offset) in [
            ("Unique Invoice Number:", &record.invoice_number, 0.0),
            ("Invoice Date:", &record.invoice_date, 15.0),
        ] {
            canvas.draw_aligned_text(
                label,
                FontFace::Bold,
                SMALL_FONT_SIZE,
                [PAGE_WIDTH - BOX_X - 125.0, PAGE_HEIGHT - 45.0 - offset],
                Alignment::Right,
            )?;
            canvas.draw_rectangle(
                Rectangle::new(
                    small_box_x,
                    PAGE_HEIGHT - 50.0 - offset,
                    SMALL_BOX_WIDTH,
                    SMALL_BOX_HEIGHT,
                ),
                stroke,
            )?;
            canvas.draw_aligned_text(
                &self.shaper.shape(value),
                FontFace::Regular,
                VALUE_FONT_SIZE,
                [small_box_center, PAGE_HEIGHT - 45.5 - offset],
                Alignment::Center,
            )?;
        }
        canvas.draw_aligned_text(
            "(Last day of the month being invoiced)",
            FontFace::Regular,
            SMALL_FONT_SIZE,
            [small_box_center, PAGE_HEIGHT - 75.5],
            Alignment::Center,
        )?;

        Ok(())
    }

    /// Draws the line-item table below the header, returning the height it takes.
    fn draw_line_items<C: Canvas + ?Sized>(
        &self,
        grid: &[Vec<String>],
        canvas: &mut C,
    ) -> Result<f32, ContextError> {
        let content_width = PAGE_WIDTH - 2.0 * TABLE_MARGIN;
        let column_widths = solve_column_widths(
            grid,
            |text, font, font_size| canvas.measure_text(text, font, font_size),
            FontFace::Regular,
            LABEL_FONT_SIZE,
            content_width,
        );
        let column_count = grid.first().map(Vec::len).unwrap_or(0);

        let table = Table::from_grid(grid, column_widths.for_columns(column_count), |row, column| {
            let header = row == 0;
            CellStyle {
                font: if header { FontFace::Bold } else { FontFace::Regular },
                font_size: if header { LABEL_FONT_SIZE } else { VALUE_FONT_SIZE },
                alignment: if column == 0 { Alignment::Left } else { Alignment::Center },
                background: Some(if header { WHITE_SMOKE } else { WHITE }),
            }
        });
        canvas.draw_table(&table, [TABLE_MARGIN, PAGE_HEIGHT - HEADER_HEIGHT])?;

        Ok(table.height())
    }

    /// Draws the payment-details label and table below the given height of the page.
    fn draw_payment_details<C: Canvas + ?Sized>(
        &self,
        record: &TutorInvoiceRecord,
        line_items_bottom: f32,
        canvas: &mut C,
    ) -> Result<(), ContextError> {
        let content_width = PAGE_WIDTH - 2.0 * TABLE_MARGIN;
        let label_width = content_width * PAYMENT_LABEL_SHARE;
        let value_width = content_width - label_width;

        let mut grid = Vec::new();
        for [label, value] in self.payment_rows(record) {
            // Long values (typically the bank address) wrap inside their cell
            let value_lines = value
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        return Ok(vec![String::new()]);
                    }
                    self.shaped_paragraph(
                        canvas,
                        line,
                        VALUE_FONT_SIZE,
                        value_width - 2.0 * HORIZONTAL_PADDING,
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;
            grid.push(vec![
                self.shaper.shape(&label),
                value_lines.concat().join("\n"),
            ]);
        }

        let table = Table::from_grid(&grid, vec![label_width, value_width], |_, column| {
            let label = column == 0;
            CellStyle {
                font: if label { FontFace::Serif } else { FontFace::Regular },
                font_size: if label { LABEL_FONT_SIZE } else { VALUE_FONT_SIZE },
                alignment: Alignment::Left,
                background: Some(if label { WHITE_SMOKE } else { WHITE }),
            }
        });

        let table_top = line_items_bottom - PAYMENT_GAP;
        canvas.draw_text(
            "Payment Details:",
            FontFace::Bold,
            LABEL_FONT_SIZE,
            [30.0, table_top + 10.0],
        )?;
        canvas.draw_table(&table, [TABLE_MARGIN, table_top])
    }
}

/// Keeps the lines fitting in a box, logging the ones left out.
fn fitting_lines(mut lines: Vec<String>, maximum: usize, field: &str, tutor_id: &str) -> Vec<String> {
    if lines.len() > maximum {
        log::warn!(
            "The {} of the tutor {} takes {} lines, only the first {} fit in its box",
            field,
            tutor_id,
            lines.len(),
            maximum
        );
        lines.truncate(maximum);
    }
    lines
}

/// A drawing command recorded while a section is drawn.
enum DrawCommand {
    Text {
        text: String,
        font: FontFace,
        font_size: f32,
        position: [f32; 2],
    },
    Rectangle {
        rectangle: Rectangle,
        paint: Paint,
    },
}

/// Records the drawings of a section, measuring with the underlying canvas, so that a section
/// failing halfway leaves nothing on the page.
struct SectionBuffer<'a, C: ?Sized> {
    canvas: &'a C,
    commands: Vec<DrawCommand>,
}

impl<C: Canvas + ?Sized> Canvas for SectionBuffer<'_, C> {
    fn measure_text(&self, text: &str, font: FontFace, font_size: f32) -> Result<f32, ContextError> {
        self.canvas.measure_text(text, font, font_size)
    }

    fn draw_text(
        &mut self,
        text: &str,
        font: FontFace,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), ContextError> {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            font,
            font_size,
            position,
        });
        Ok(())
    }

    fn draw_rectangle(&mut self, rectangle: Rectangle, paint: Paint) -> Result<(), ContextError> {
        self.commands.push(DrawCommand::Rectangle { rectangle, paint });
        Ok(())
    }
}

/// Draws a section into a buffer, then onto the canvas if the whole section succeeded.
fn draw_section<C, T, F>(canvas: &mut C, draw: F) -> Result<T, ContextError>
where
    C: Canvas + ?Sized,
    F: FnOnce(&mut SectionBuffer<'_, C>) -> Result<T, ContextError>,
{
    let mut buffer = SectionBuffer {
        canvas: &*canvas,
        commands: Vec::new(),
    };
    let value = draw(&mut buffer)?;
    let commands = buffer.commands;

    for command in commands {
        match command {
            DrawCommand::Text {
                text,
                font,
                font_size,
                position,
            } => canvas.draw_text(&text, font, font_size, position)?,
            DrawCommand::Rectangle { rectangle, paint } => canvas.draw_rectangle(rectangle, paint)?,
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::LogicalOrder;
    use crate::subject_grades::SubjectGradePair;

    fn record() -> TutorInvoiceRecord {
        TutorInvoiceRecord {
            id: "17".into(),
            full_name: "Mona Adel".into(),
            subjects: "Math - Science".into(),
            accrual_month: "October".into(),
            crm_duration: 1.5,
            crm_price: 200,
            crm_payment: 300,
            demo_month: "October".into(),
            demo_count: 2.0,
            demo_price: 50,
            demo_total: 100,
            total_salary: 900,
            subject_grades: vec![SubjectGradePair {
                index: 1,
                description: "Math G5".into(),
                total_sessions: 5.0,
                session_price: 100,
                total_sessions_price: 500,
            }],
            ..TutorInvoiceRecord::default()
        }
    }

    #[test]
    fn line_items_list_pairs_then_fixed_rows() {
        let renderer = InvoiceRenderer::new(&InvoiceConfiguration::default(), Box::new(LogicalOrder));
        let rows = renderer.line_item_rows(&record());

        assert_eq!(rows.len(), 1 + 1 + 5);
        assert_eq!(rows[0][2], "Rate\n(EGP)");
        assert_eq!(rows[1], ["Math G5", "5", "EGP 100", "EGP 500"]);
        assert_eq!(rows[4], ["CRM", "1.5 hr", "EGP 200", "EGP 300"]);
        assert_eq!(rows[5], ["Demo October", "2", "EGP 50", "EGP 100"]);
        assert_eq!(rows[6], ["Total", "--", "--", "EGP 900"]);
    }

    #[test]
    fn payment_rows_use_the_configured_currency() {
        let configuration = InvoiceConfiguration {
            currency_label: "USD".into(),
            ..InvoiceConfiguration::default()
        };
        let renderer = InvoiceRenderer::new(&configuration, Box::new(LogicalOrder));
        let rows = renderer.payment_rows(&record());

        assert_eq!(rows.len(), 7);
        assert_eq!(rows[5], ["Account Type".to_string(), "USD".to_string()]);
        assert_eq!(rows[6][1], "Transfer");
    }

    #[test]
    fn report_lists_failed_sections() {
        let mut report = RenderReport {
            tutor_id: "17".into(),
            outcomes: Vec::new(),
        };
        report.record(Section::Header, Ok(()));
        report.record::<()>(Section::PaymentDetails, Err(ContextError::with_context("No glyph")));

        assert!(!report.is_complete());
        assert_eq!(report.failed_sections(), [Section::PaymentDetails]);
    }
}
