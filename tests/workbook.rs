use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use tutor_invoices::{
    configuration::{FontPaths, InvoiceConfiguration},
    consolidate::consolidate_all,
    consolidated_table::{ConsolidatedTable, MISSING_PAIR_PLACEHOLDER},
    pipeline::{self, BatchProgress},
    session::{columns, group_by_tutor, CellValue},
    workbook::{load_session_rows, save_consolidated_table},
};

/// Writes a session spreadsheet with every required column but the left out one.
/// The `Full Name` header is written with stray spaces.
fn write_sessions(path: &Path, left_out: Option<&str>) {
    let headers: Vec<String> = columns::required()
        .into_iter()
        .filter(|column| Some(column.as_str()) != left_out)
        .collect();
    let data_rows: [&[(&str, &str)]; 2] = [
        &[
            (columns::ID, "17"),
            (columns::FULL_NAME, "  Mona   Adel "),
            (columns::INVOICE_DATE, "2024-10-31"),
            (columns::GRADE, "G5"),
            (columns::ACCRUAL_MONTH, "October 2024"),
        ],
        &[
            (columns::ID, "17"),
            (columns::FULL_NAME, "Mona Adel"),
            (columns::GRADE, "G6"),
        ],
    ];

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (column, header) in headers.iter().enumerate() {
        let written_header = if header == columns::FULL_NAME {
            " Full  Name ".to_string()
        } else {
            header.clone()
        };
        worksheet
            .write_string(0, column as u16, written_header)
            .unwrap();
    }

    // The empty second row is skipped on load
    for (data_index, cells) in data_rows.iter().enumerate() {
        let row = data_index as u32 * 2 + 1;
        for (column, header) in headers.iter().enumerate() {
            let column = column as u16;
            match cells.iter().find(|(name, _)| *name == header.as_str()) {
                Some((_, text)) => {
                    worksheet.write_string(row, column, *text).unwrap();
                }
                None if *header == columns::MOBILE => {
                    worksheet.write_number(row, column, 201001234567.0).unwrap();
                }
                None if *header == columns::subject(1) => {
                    worksheet.write_string(row, column, "Math").unwrap();
                }
                None if *header == columns::total_sessions(1) => {
                    worksheet.write_number(row, column, 2.0).unwrap();
                }
                None if *header == columns::session_price(1) => {
                    worksheet.write_number(row, column, 100.0).unwrap();
                }
                None => {}
            }
        }
    }
    workbook.save(path).unwrap();
}

#[test]
fn loading_normalizes_the_rows() {
    let directory = tempfile::tempdir().unwrap();
    let input_path = directory.path().join("tutorlist.xlsx");
    write_sessions(&input_path, None);

    let rows = load_session_rows(&input_path).unwrap();
    assert_eq!(rows.len(), 2);

    let first_row = &rows[0];
    assert_eq!(first_row.text(columns::FULL_NAME).unwrap(), "Mona Adel");
    assert_eq!(first_row.text(columns::INVOICE_DATE).unwrap(), "31 October 2024");
    assert_eq!(first_row.text(columns::MOBILE).unwrap(), "201001234567");
    assert_eq!(first_row.number(columns::total_sessions(1).as_str()).unwrap(), 2.0);
    assert_eq!(first_row.cell(columns::SWIFT), Some(&CellValue::Empty));
    assert_eq!(rows[1].text(columns::GRADE).unwrap(), "G6");
}

#[test]
fn missing_required_columns_are_fatal() {
    let directory = tempfile::tempdir().unwrap();
    let input_path = directory.path().join("tutorlist.xlsx");
    write_sessions(&input_path, Some(columns::SWIFT));

    let error = load_session_rows(&input_path).unwrap_err();
    assert!(error.to_string().contains("Swift"), "{}", error);
}

#[test]
fn unreadable_spreadsheets_are_fatal() {
    let directory = tempfile::tempdir().unwrap();
    assert!(load_session_rows(&directory.path().join("absent.xlsx")).is_err());
}

#[test]
fn consolidated_table_is_saved_with_its_padding() {
    let directory = tempfile::tempdir().unwrap();
    let input_path = directory.path().join("tutorlist.xlsx");
    let table_path = directory.path().join("consolidated_tutor_data.xlsx");
    write_sessions(&input_path, None);

    let rows = load_session_rows(&input_path).unwrap();
    let mut second_tutor = rows[0]
        .clone()
        .with_text(columns::ID, "18")
        .with_text(columns::subject(2), "Science")
        .with_text(columns::subject(3), "Physics");
    second_tutor = second_tutor
        .with_number(columns::total_sessions(2), 1.0)
        .with_number(columns::session_price(2), 120.0)
        .with_number(columns::total_sessions(3), 1.0);
    let mut all_rows = rows;
    all_rows.push(second_tutor);

    let records = consolidate_all(&group_by_tutor(all_rows), &mut BatchProgress::default());
    let table = ConsolidatedTable::from_records(&records);
    save_consolidated_table(&table, &table_path).unwrap();

    let mut workbook = open_workbook_auto(&table_path).unwrap();
    let range = workbook.worksheet_range_at(0).unwrap().unwrap();
    let saved_rows: Vec<&[Data]> = range.rows().collect();
    assert_eq!(saved_rows.len(), 3);
    assert_eq!(saved_rows[0].len(), table.headers.len());
    for (saved, header) in saved_rows[0].iter().zip(&table.headers) {
        assert_eq!(saved, &Data::String(header.clone()));
    }

    // Tutor 17 taught Math G5 and Math G6, tutor 18 taught Math, Science and Physics in G5
    assert_eq!(table.pair_column_count(), 3);
    let first_tutor = saved_rows[1];
    let padding_start = first_tutor.len() - 4;
    assert_eq!(
        first_tutor[padding_start],
        Data::String(MISSING_PAIR_PLACEHOLDER.to_string())
    );
}

#[test]
fn pipeline_stops_without_a_session_spreadsheet() {
    let directory = tempfile::tempdir().unwrap();
    let configuration = InvoiceConfiguration {
        input_path: directory.path().join("absent.xlsx"),
        consolidated_table_path: directory.path().join("consolidated.xlsx"),
        output_directory: directory.path().join("PDFs"),
        ..InvoiceConfiguration::default()
    };

    assert!(pipeline::run(&configuration).is_err());
    assert!(!configuration.consolidated_table_path.exists());
    assert!(!configuration.output_directory.exists());
}

#[test]
fn pipeline_saves_the_table_before_loading_the_fonts() {
    let directory = tempfile::tempdir().unwrap();
    let input_path = directory.path().join("tutorlist.xlsx");
    write_sessions(&input_path, None);
    let missing_font = directory.path().join("missing.ttf");
    let configuration = InvoiceConfiguration {
        input_path,
        consolidated_table_path: directory.path().join("consolidated.xlsx"),
        output_directory: directory.path().join("PDFs"),
        fonts: FontPaths {
            regular: missing_font.clone(),
            bold: missing_font.clone(),
            serif: missing_font,
        },
        ..InvoiceConfiguration::default()
    };

    assert!(pipeline::run(&configuration).is_err());
    assert!(configuration.consolidated_table_path.exists());
    assert!(!configuration.output_directory.exists());
}
