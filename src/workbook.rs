use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use time::format_description::BorrowedFormatItem;
use time::macros::{date, format_description};
use time::{Date, Duration};

use crate::consolidated_table::ConsolidatedTable;
use crate::error::ContextError;
use crate::normalize::normalize_space;
use crate::session::{columns, CellValue, SessionRow};

/// Loads the session rows from the first worksheet of the spreadsheet at the given path.
///
/// The first row holds the column names, which are normalized before use. Every error of this
/// function is fatal for the run: an unreadable file, a workbook without worksheets, a
/// worksheet without data rows, or a missing required column.
pub fn load_session_rows(path: &Path) -> Result<Vec<SessionRow>, ContextError> {
    let mut workbook = open_workbook_auto(path).map_err(|error| {
        ContextError::with_error(format!("Unable to open the spreadsheet {:?}", path), &error)
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            ContextError::with_context(format!("The spreadsheet {:?} has no worksheets", path))
        })?
        .map_err(|error| {
            ContextError::with_error(format!("Unable to read the spreadsheet {:?}", path), &error)
        })?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| ContextError::with_context(format!("The spreadsheet {:?} is empty", path)))?;
    let column_names: Vec<String> = header
        .iter()
        .map(|cell| normalize_space(&cell_value(cell).as_text()))
        .collect();

    let missing_columns: Vec<String> = columns::required()
        .into_iter()
        .filter(|required| !column_names.contains(required))
        .collect();
    if !missing_columns.is_empty() {
        return Err(ContextError::with_context(format!(
            "The spreadsheet {:?} is missing the required columns {:?}",
            path, missing_columns
        )));
    }

    let session_rows: Vec<SessionRow> = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            let mut session_row = SessionRow::new();
            for (column_name, cell) in column_names.iter().zip(row.iter()) {
                if column_name.is_empty() {
                    continue;
                }
                let value = if column_name == columns::INVOICE_DATE {
                    invoice_date_value(cell)
                } else {
                    cell_value(cell)
                };
                session_row.cells.insert(column_name.clone(), value);
            }
            session_row
        })
        .collect();

    if session_rows.is_empty() {
        return Err(ContextError::with_context(format!(
            "The spreadsheet {:?} has no data rows",
            path
        )));
    }
    log::info!("Loaded {} session rows from {:?}", session_rows.len(), path);

    Ok(session_rows)
}

/// Converts a spreadsheet cell into a `CellValue`, normalizing its text.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(normalize_space(text)),
        Data::Float(number) => CellValue::Number(*number),
        Data::Int(number) => CellValue::Number(*number as f64),
        Data::Bool(boolean) => CellValue::Text(boolean.to_string()),
        Data::DateTime(date_time) => CellValue::Number(date_time.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(normalize_space(text)),
        Data::Error(error) => CellValue::Text(format!("{:?}", error)),
    }
}

/// Invoice dates are shown as `31 October 2026`, whether they are stored as date cells or text.
fn invoice_date_value(cell: &Data) -> CellValue {
    let date = match cell {
        Data::DateTime(date_time) => date_from_serial(date_time.as_f64()),
        Data::DateTimeIso(text) | Data::String(text) => date_from_text(text),
        _ => None,
    };

    match date.map(format_invoice_date) {
        Some(Ok(formatted)) => CellValue::Text(formatted),
        Some(Err(error)) => {
            log::warn!("Unable to format the invoice date {:?}: {}", cell, error);
            cell_value(cell)
        }
        None => cell_value(cell),
    }
}

/// The day before serial 1 of the 1900 date system, once the fictitious 1900-02-29 is accounted for.
const SERIAL_EPOCH: Date = date!(1899 - 12 - 30);

/// Converts a spreadsheet date serial (1900 date system) into a date.
pub fn date_from_serial(serial: f64) -> Option<Date> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let mut days = serial.floor() as i64;
    // Serials before the fictitious leap day are one day ahead of the real calendar
    if days < 60 {
        days += 1;
    }
    SERIAL_EPOCH.checked_add(Duration::days(days))
}

/// Parses a date typed as text: ISO (`2026-10-31`, `2026-1-5`, with or without a time of day),
/// slashed (`10/31/2026`, or `31/10/2026` when the month cannot come first) or spelled out
/// (`31 October 2026`, `31 Oct 2026`, `October 31, 2026`).
pub fn date_from_text(text: &str) -> Option<Date> {
    let text = text.trim();
    let date_part = match text.rsplit_once([' ', 'T']) {
        Some((date_part, time_of_day)) if time_of_day.contains(':') => date_part.trim_end(),
        _ => text,
    };

    let formats: [&[BorrowedFormatItem<'_>]; 8] = [
        format_description!("[year]-[month padding:none]-[day padding:none]"),
        format_description!("[year]/[month padding:none]/[day padding:none]"),
        format_description!("[month padding:none]/[day padding:none]/[year]"),
        format_description!("[day padding:none]/[month padding:none]/[year]"),
        format_description!("[day padding:none]-[month padding:none]-[year]"),
        format_description!("[day padding:none] [month repr:long case_sensitive:false] [year]"),
        format_description!("[day padding:none] [month repr:short case_sensitive:false] [year]"),
        format_description!("[month repr:long case_sensitive:false] [day padding:none], [year]"),
    ];
    formats
        .iter()
        .find_map(|format| Date::parse(date_part, format).ok())
}

pub fn format_invoice_date(date: Date) -> Result<String, ContextError> {
    date.format(format_description!("[day] [month repr:long] [year]"))
        .map_err(|error| ContextError::with_error(format!("Unable to format the date {}", date), &error))
}

/// Writes the consolidated table to a single-worksheet spreadsheet, with a bold header row.
pub fn save_consolidated_table(table: &ConsolidatedTable, path: &Path) -> Result<(), ContextError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Consolidated")
        .map_err(|error| ContextError::with_error("Unable to name the worksheet", &error))?;

    for (column_index, header) in table.headers.iter().enumerate() {
        let column = column_number(column_index)?;
        worksheet
            .write_string_with_format(0, column, header, &header_format)
            .map_err(|error| {
                ContextError::with_error(format!("Unable to write the header {:?}", header), &error)
            })?;
    }

    for (row_index, row) in table.rows.iter().enumerate() {
        let spreadsheet_row = u32::try_from(row_index + 1).map_err(|error| {
            ContextError::with_error("Too many rows for a worksheet", &error)
        })?;
        for (column_index, cell) in row.iter().enumerate() {
            let column = column_number(column_index)?;
            let written = match cell {
                CellValue::Empty => continue,
                CellValue::Number(number) => worksheet.write_number(spreadsheet_row, column, *number),
                CellValue::Text(text) => worksheet.write_string(spreadsheet_row, column, text),
            };
            written.map_err(|error| {
                ContextError::with_error(
                    format!("Unable to write the cell at row {}, column {}", row_index + 2, column_index + 1),
                    &error,
                )
            })?;
        }
    }

    workbook.save(path).map_err(|error| {
        ContextError::with_error(format!("Unable to save the spreadsheet {:?}", path), &error)
    })?;
    log::info!("Consolidated data has been written to {:?}", path);

    Ok(())
}

fn column_number(column_index: usize) -> Result<u16, ContextError> {
    u16::try_from(column_index)
        .map_err(|error| ContextError::with_error("Too many columns for a worksheet", &error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_convert_to_calendar_dates() {
        let date = date_from_serial(45596.0).unwrap();
        assert_eq!(format_invoice_date(date).unwrap(), "31 October 2024");
        let date = date_from_serial(1.0).unwrap();
        assert_eq!(format_invoice_date(date).unwrap(), "01 January 1900");
        assert_eq!(date_from_serial(61.0), Some(date!(1900 - 03 - 01)));
        assert!(date_from_serial(0.0).is_none());
    }

    #[test]
    fn common_text_dates_are_formatted() {
        for (text, formatted) in [
            ("2026-10-31", "31 October 2026"),
            ("2026-1-5", "05 January 2026"),
            ("2026-10-31T00:00:00", "31 October 2026"),
            ("2026-10-31 00:00:00", "31 October 2026"),
            ("2026/10/31", "31 October 2026"),
            ("10/31/2026", "31 October 2026"),
            ("31/10/2026", "31 October 2026"),
            ("31 October 2026", "31 October 2026"),
            ("31 oct 2026", "31 October 2026"),
            ("October 31, 2026", "31 October 2026"),
        ] {
            let value = invoice_date_value(&Data::String(text.into()));
            assert_eq!(value, CellValue::Text(formatted.into()), "{:?}", text);
        }
    }

    #[test]
    fn ambiguous_slashed_dates_put_the_month_first() {
        assert_eq!(date_from_text("05/01/2026"), Some(date!(2026 - 05 - 01)));
    }

    #[test]
    fn other_text_is_kept() {
        let value = invoice_date_value(&Data::String("end of month".into()));
        assert_eq!(value, CellValue::Text("end of month".into()));
        let value = invoice_date_value(&Data::String("2026-13-01".into()));
        assert_eq!(value, CellValue::Text("2026-13-01".into()));
    }

    #[test]
    fn text_cells_are_normalized() {
        let value = cell_value(&Data::String("  Math  - - Physics ".into()));
        assert_eq!(value, CellValue::Text("Math - Physics".into()));
    }
}
