//! Tutor invoices turns a spreadsheet of tutoring sessions, one row per session line, into one
//! consolidated record per tutor and renders every record as a one-page PDF invoice.
//!
//! The batch is run by `pipeline::run`: the rows are loaded with `workbook`, grouped by tutor and folded
//! into `TutorInvoiceRecord`s by `consolidate`, saved as a flat spreadsheet through `consolidated_table`,
//! then drawn by the `InvoiceRenderer` onto a `PdfDocument`. Every step can also be used on its own.

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// Every error carries a human readable context and, if it was propagated from another error,
/// the message of that error.
pub mod error;

/// Whitespace and `" - "` separator normalization of the text fields.
pub mod normalize;

/// The raw rows of the session spreadsheet, their columns, and their grouping by tutor.
pub mod session;

/// Reading the session spreadsheet and writing the consolidated one.
///
/// The first worksheet of the input is read with `calamine`, its header row names the columns
/// (normalized, so that stray spaces do not matter) and every required column must be present.
/// Spreadsheet dates of the `Invoice Date` column are formatted as `31 October 2024`.
pub mod workbook;

/// The subject and grade pairs of a tutor, with their accumulated sessions and prices.
pub mod subject_grades;

/// The folding of the rows of a tutor into a single `TutorInvoiceRecord`.
///
/// # Introduction
///
/// Profile fields come from the first row of the tutor, quantities are summed, and the fields
/// which are filled in on a single row take the first non-zero (or non-empty) value. A tutor whose
/// rows are malformed is logged and skipped by `consolidate_all`, the other tutors are not affected.
pub mod consolidate;

/// The flat, one row per tutor, view of the records, with the subject and grade pairs padded
/// to the largest number of pairs of any tutor.
pub mod consolidated_table;

/// The `TextShaper` trait, which turns text into the order it is drawn in.
pub mod shaping;

/// Fonts loaded from TTF files, measured and mapped to glyphs with `owned_ttf_parser`.
pub mod fonts;

/// The `Canvas` drawing service the invoices are rendered onto, with its geometric types.
pub mod canvas;

/// Tables of styled cells, laid out with fixed column widths.
pub mod table;

/// Column widths fitted to a target width from the measured text of the cells.
pub mod column_widths;

/// The module were the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// A `PdfDocument` is created empty, given pages with `add_page` and fonts with `add_font`, then drawn
/// onto through its `Canvas` implementation. Text is written as glyph IDs of embedded Type0 fonts,
/// whose ToUnicode maps keep it searchable. `write_all` assembles the pages, fonts and information
/// dictionary into the underlying `lopdf` document, which `save` (or `save_to_bytes`) then writes out.
pub mod pdf;

/// The JSON configuration of a run, where every field has a default.
pub mod configuration;

/// The layout of an invoice page: header boxes, line items and payment details.
pub mod renderer;

/// The batch run, from the session spreadsheet to the invoices on disk.
pub mod pipeline;
