use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::canvas::FontFace;
use crate::configuration::InvoiceConfiguration;
use crate::consolidate::{consolidate_all, TutorInvoiceRecord};
use crate::consolidated_table::ConsolidatedTable;
use crate::error::ContextError;
use crate::fonts::FontSet;
use crate::normalize::normalize_space;
use crate::pdf::PdfDocument;
use crate::renderer::{InvoiceRenderer, RenderReport, PAGE_HEIGHT, PAGE_MARGIN, PAGE_WIDTH};
use crate::session::group_by_tutor;
use crate::shaping::BidiShaper;
use crate::workbook::{load_session_rows, save_consolidated_table};

/// The counters of a run, carried from one stage and one tutor to the next.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// Tutors whose rows have been consolidated into a record.
    pub consolidated: usize,
    /// Tutors left out because their rows could not be consolidated.
    pub skipped_tutors: Vec<String>,
    /// Profile columns whose values differ between the rows of a same tutor.
    pub inconsistent_profiles: usize,
    /// Invoices written to disk, complete or not.
    pub rendered: usize,
    /// Tutors whose invoice has been written with some sections missing.
    pub incomplete_documents: Vec<String>,
    /// Tutors whose invoice could not be written at all.
    pub failed_documents: Vec<String>,
}

impl BatchProgress {
    pub fn summary(&self) -> String {
        format!(
            "{} tutors consolidated ({} skipped, {} profile disagreements), {} invoices written ({} incomplete, {} failed)",
            self.consolidated,
            self.skipped_tutors.len(),
            self.inconsistent_profiles,
            self.rendered,
            self.incomplete_documents.len(),
            self.failed_documents.len(),
        )
    }
}

/// Runs the whole batch: loads the session rows, consolidates them per tutor, saves the
/// consolidated table and writes the invoice of every tutor.
///
/// Only a failure to load the rows or the fonts (or to create the output directory) aborts the run,
/// the failures specific to a tutor are logged and counted in the returned progress.
pub fn run(configuration: &InvoiceConfiguration) -> Result<BatchProgress, ContextError> {
    let rows = load_session_rows(&configuration.input_path)?;
    let groups = group_by_tutor(rows);
    let mut progress = BatchProgress::default();
    let records = consolidate_all(&groups, &mut progress);
    log::info!(
        "Consolidated {} of {} tutors",
        records.len(),
        groups.len()
    );

    let consolidated_table = ConsolidatedTable::from_records(&records);
    if let Err(error) =
        save_consolidated_table(&consolidated_table, &configuration.consolidated_table_path)
    {
        log::error!("Unable to save the consolidated table: {}", error);
    }

    let fonts = FontSet::load(&configuration.fonts)?;
    std::fs::create_dir_all(&configuration.output_directory).map_err(|error| {
        ContextError::with_error(
            format!(
                "Unable to create the output directory {:?}",
                configuration.output_directory
            ),
            &error,
        )
    })?;

    let renderer = InvoiceRenderer::new(configuration, Box::new(BidiShaper));
    for (index, record) in records.iter().enumerate() {
        let output_path = configuration
            .output_directory
            .join(invoice_file_name(record));
        match write_invoice(&renderer, &fonts, record, &output_path) {
            Ok(report) => {
                progress.rendered += 1;
                if !report.is_complete() {
                    log::warn!(
                        "The invoice of the tutor {} is missing the sections {:?}",
                        record.id,
                        report.failed_sections()
                    );
                    progress.incomplete_documents.push(record.id.clone());
                }
                log::info!(
                    "[{}/{}] Saved the invoice {:?}",
                    index + 1,
                    records.len(),
                    output_path
                );
            }
            Err(error) => {
                log::error!(
                    "Unable to write the invoice of the tutor {}: {}",
                    record.id,
                    error
                );
                progress.failed_documents.push(record.id.clone());
            }
        }
    }

    Ok(progress)
}

/// Renders the invoice of the record onto a new document and writes it to the given path.
pub fn write_invoice(
    renderer: &InvoiceRenderer,
    fonts: &FontSet,
    record: &TutorInvoiceRecord,
    output_path: &Path,
) -> Result<RenderReport, ContextError> {
    let mut pdf_document = PdfDocument::new(document_identifier(record));
    pdf_document.add_page(
        PAGE_WIDTH + 2.0 * PAGE_MARGIN,
        PAGE_HEIGHT + 2.0 * PAGE_MARGIN,
        PAGE_MARGIN,
    );
    for font_face in [FontFace::Regular, FontFace::Bold, FontFace::Serif] {
        pdf_document.add_font(font_face, fonts.get(font_face).clone());
    }

    let report = renderer.render(record, &mut pdf_document);

    let instance_id = format!("{:032x}", OffsetDateTime::now_utc().unix_timestamp_nanos());
    pdf_document.write_all(&instance_id, &format!("Invoice {}", record.invoice_number))?;

    let file = File::create(output_path).map_err(|error| {
        ContextError::with_error(format!("Unable to create the file {:?}", output_path), &error)
    })?;
    let mut writer = BufWriter::new(file);
    pdf_document.save(&mut writer)?;
    writer.flush().map_err(|error| {
        ContextError::with_error(format!("Unable to write the file {:?}", output_path), &error)
    })?;

    Ok(report)
}

/// The file name of the invoice of a tutor, `<Full Name>_<ID>.pdf`, with the characters
/// which cannot appear in a file name replaced by underscores.
pub fn invoice_file_name(record: &TutorInvoiceRecord) -> String {
    format!(
        "{}_{}.pdf",
        sanitize_file_name(&normalize_space(&record.full_name)),
        sanitize_file_name(&record.id)
    )
}

fn sanitize_file_name(text: &str) -> String {
    text.chars()
        .map(|character| match character {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            character if character.is_control() => '_',
            character => character,
        })
        .collect()
}

/// A stable 32 hexadecimal digits identifier of the invoice, the first part of the PDF `ID` tag.
fn document_identifier(record: &TutorInvoiceRecord) -> String {
    let hash = |value: &str| {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    };
    format!("{:016x}{:016x}", hash(&record.id), hash(&record.invoice_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_replace_path_separators() {
        let record = TutorInvoiceRecord {
            id: "17".into(),
            full_name: "  Mona   A/B: Adel ".into(),
            ..TutorInvoiceRecord::default()
        };
        assert_eq!(invoice_file_name(&record), "Mona A_B_ Adel_17.pdf");
    }

    #[test]
    fn document_identifiers_are_stable() {
        let record = TutorInvoiceRecord {
            id: "17".into(),
            invoice_number: "INV-0042".into(),
            ..TutorInvoiceRecord::default()
        };
        let identifier = document_identifier(&record);
        assert_eq!(identifier.len(), 32);
        assert_eq!(identifier, document_identifier(&record.clone()));
    }

    #[test]
    fn summary_counts_every_outcome() {
        let progress = BatchProgress {
            consolidated: 3,
            skipped_tutors: vec!["9".into()],
            rendered: 3,
            incomplete_documents: vec!["4".into()],
            ..BatchProgress::default()
        };
        assert_eq!(
            progress.summary(),
            "3 tutors consolidated (1 skipped, 0 profile disagreements), 3 invoices written (1 incomplete, 0 failed)"
        );
    }
}
