use tutor_invoices::{
    canvas::{Canvas, FontFace, Paint, Rectangle},
    column_widths::DEFAULT_TABLE_WIDTH,
    configuration::InvoiceConfiguration,
    consolidate::TutorInvoiceRecord,
    error::ContextError,
    renderer::{InvoiceRenderer, Section, HEADER_HEIGHT, PAGE_HEIGHT, TABLE_MARGIN},
    shaping::{LogicalOrder, TextShaper},
    subject_grades::SubjectGradePair,
};

/// Records what is drawn, measuring every character as half the font size.
/// Any text containing the marker cannot be measured.
#[derive(Default)]
struct RecordingCanvas {
    marker: Option<&'static str>,
    texts: Vec<(String, FontFace, [f32; 2])>,
    rectangles: Vec<(Rectangle, Paint)>,
}

impl Canvas for RecordingCanvas {
    fn measure_text(&self, text: &str, _font: FontFace, font_size: f32) -> Result<f32, ContextError> {
        if let Some(marker) = self.marker {
            if text.contains(marker) {
                return Err(ContextError::with_context(format!(
                    "Unable to measure {:?}",
                    text
                )));
            }
        }
        Ok(text.chars().count() as f32 * font_size * 0.5)
    }

    fn draw_text(
        &mut self,
        text: &str,
        font: FontFace,
        _font_size: f32,
        position: [f32; 2],
    ) -> Result<(), ContextError> {
        self.texts.push((text.to_string(), font, position));
        Ok(())
    }

    fn draw_rectangle(&mut self, rectangle: Rectangle, paint: Paint) -> Result<(), ContextError> {
        self.rectangles.push((rectangle, paint));
        Ok(())
    }
}

impl RecordingCanvas {
    fn has_text(&self, text: &str) -> bool {
        self.texts.iter().any(|(drawn, _, _)| drawn == text)
    }
}

fn record() -> TutorInvoiceRecord {
    TutorInvoiceRecord {
        id: "17".into(),
        full_name: "Mona Adel".into(),
        address: "12 Nile Street, Zamalek, Cairo".into(),
        invoice_number: "INV-0017".into(),
        invoice_date: "31 October 2024".into(),
        mobile: "201001234567".into(),
        email_address: "mona@example.com".into(),
        subjects: "Math - Science".into(),
        accrual_month: "October 2024".into(),
        total_sessions: 9.0,
        crm_duration: 1.5,
        crm_price: 200,
        crm_payment: 300,
        total_salary: 1_580,
        bank_account_name: "Mona Adel".into(),
        bank_name: "National Bank of Egypt".into(),
        bank_address: "1187 Corniche El Nil, Cairo".into(),
        account_number: "100200300".into(),
        iban: "EG380019000500000000263180002".into(),
        swift: "NBEGEGCX".into(),
        subject_grades: vec![
            SubjectGradePair {
                index: 1,
                description: "Math G5".into(),
                total_sessions: 5.0,
                session_price: 100,
                total_sessions_price: 500,
            },
            SubjectGradePair {
                index: 2,
                description: "Science G6".into(),
                total_sessions: 4.0,
                session_price: 120,
                total_sessions_price: 480,
            },
        ],
        ..TutorInvoiceRecord::default()
    }
}

/// Wraps every line in guillemets, telling shaped text apart from raw text.
struct MarkingShaper;

impl TextShaper for MarkingShaper {
    fn shape(&self, text: &str) -> String {
        text.split('\n')
            .map(|line| format!("«{line}»"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn renderer() -> InvoiceRenderer {
    InvoiceRenderer::new(&InvoiceConfiguration::default(), Box::new(LogicalOrder))
}

#[test]
fn every_section_is_drawn() {
    let mut canvas = RecordingCanvas::default();
    let report = renderer().render(&record(), &mut canvas);

    assert!(report.is_complete(), "{:?}", report);
    assert_eq!(report.outcomes.len(), 4);
    assert!(canvas
        .rectangles
        .iter()
        .any(|(_, paint)| *paint == Paint::Stroke { line_width: 1.5 }));
    for text in [
        "Invoice",
        "Mona Adel",
        "INV-0017",
        "Math G5",
        "EGP 480",
        "EGP 1580",
        "Payment Details:",
        "NBEGEGCX",
        "Transfer",
    ] {
        assert!(canvas.has_text(text), "{:?} has not been drawn", text);
    }

    // The line-item table starts right below the header
    let description = canvas
        .texts
        .iter()
        .find(|(text, _, _)| text == "Description")
        .unwrap();
    assert_eq!(description.1, FontFace::Bold);
    assert!(description.2[1] < PAGE_HEIGHT - HEADER_HEIGHT);
    assert!(description.2[1] > PAGE_HEIGHT - HEADER_HEIGHT - 40.0);
}

#[test]
fn payment_table_follows_the_line_items() {
    let mut canvas = RecordingCanvas::default();
    renderer().render(&record(), &mut canvas);

    let baseline_of = |wanted: &str| {
        canvas
            .texts
            .iter()
            .find(|(text, _, _)| text == wanted)
            .map(|(_, _, position)| position[1])
            .unwrap()
    };
    // The header row holds a "Total" heading too, the total row is found by its amount
    assert!(baseline_of("EGP 1580") < baseline_of("Math G5"));
    assert!(baseline_of("Payment Details:") < baseline_of("EGP 1580"));
    assert!(baseline_of("Account Name") < baseline_of("Payment Details:"));
}

#[test]
fn failed_payment_section_keeps_the_rest_of_the_page() {
    let mut failing_record = record();
    failing_record.bank_address = "Unreadable UNMEASURABLE address".into();

    let mut canvas = RecordingCanvas {
        marker: Some("UNMEASURABLE"),
        ..RecordingCanvas::default()
    };
    let report = renderer().render(&failing_record, &mut canvas);

    assert_eq!(report.failed_sections(), [Section::PaymentDetails]);
    assert!(canvas.has_text("Mona Adel"));
    assert!(canvas.has_text("Math G5"));
    assert!(canvas.has_text("EGP 1580"));
    // Nothing of the failed section reaches the page
    assert!(!canvas.has_text("Payment Details:"));
    assert!(!canvas.has_text("Account Name"));
    assert!(!canvas.has_text("National Bank of Egypt"));
}

#[test]
fn failed_header_keeps_the_tables() {
    let mut failing_record = record();
    failing_record.invoice_number = "UNMEASURABLE".into();

    let mut canvas = RecordingCanvas {
        marker: Some("UNMEASURABLE"),
        ..RecordingCanvas::default()
    };
    let report = renderer().render(&failing_record, &mut canvas);

    assert_eq!(report.failed_sections(), [Section::Header]);
    assert!(!canvas.has_text("mona@example.com"));
    assert!(canvas.has_text("Math G5"));
    assert!(canvas.has_text("Payment Details:"));
}

#[test]
fn every_dynamic_text_is_shaped() {
    let renderer = InvoiceRenderer::new(&InvoiceConfiguration::default(), Box::new(MarkingShaper));
    let record = record();
    let mut canvas = RecordingCanvas::default();
    let report = renderer.render(&record, &mut canvas);
    assert!(report.is_complete(), "{:?}", report);

    let fixed_labels = [
        "Invoice",
        "Name:",
        "Mobile Number:",
        "Email Address:",
        "Address:",
        "To:",
        "For:",
        "Unique Invoice Number:",
        "Invoice Date:",
        "(Last day of the month being invoiced)",
        "Payment Details:",
    ];
    for (text, _, _) in &canvas.texts {
        assert!(
            fixed_labels.contains(&text.as_str()) || (text.starts_with('«') && text.ends_with('»')),
            "{:?} has been drawn without shaping",
            text
        );
    }

    let mut values: Vec<String> = [
        &record.full_name,
        &record.mobile,
        &record.email_address,
        &record.address,
        &record.invoice_number,
        &record.invoice_date,
        &record.subjects,
        &record.accrual_month,
        &record.bank_name,
        &record.bank_address,
        &record.account_number,
        &record.iban,
        &record.swift,
    ]
    .into_iter()
    .cloned()
    .collect();
    values.push("Transfer".into());
    for row in renderer.line_item_rows(&record) {
        for cell in row {
            values.extend(cell.split('\n').map(str::to_string));
        }
    }
    for value in values {
        assert!(
            canvas.has_text(&format!("«{value}»")),
            "{:?} has not been drawn shaped",
            value
        );
    }
}

#[test]
fn unmeasurable_line_items_fall_back_to_a_narrow_table() {
    let mut failing_record = record();
    failing_record.subject_grades[0].description = "UNMEASURABLE G5".into();

    let mut canvas = RecordingCanvas {
        marker: Some("UNMEASURABLE"),
        ..RecordingCanvas::default()
    };
    let report = renderer().render(&failing_record, &mut canvas);

    assert!(report.is_complete(), "{:?}", report);
    assert!(canvas.has_text("UNMEASURABLE G5"));
    assert!(canvas.has_text("Payment Details:"));

    // The header row of the line items, split equally over the default width
    let table_top = PAGE_HEIGHT - HEADER_HEIGHT;
    let header_cells: Vec<Rectangle> = canvas
        .rectangles
        .iter()
        .filter(|(rectangle, paint)| {
            matches!(paint, Paint::Fill { .. })
                && (rectangle.y + rectangle.height - table_top).abs() < 0.01
        })
        .map(|(rectangle, _)| *rectangle)
        .collect();
    let column_width = DEFAULT_TABLE_WIDTH / 4.0;
    assert_eq!(header_cells.len(), 4);
    for (index, cell) in header_cells.iter().enumerate() {
        assert!((cell.width - column_width).abs() < 1e-4, "{:?}", cell);
        assert!((cell.x - (TABLE_MARGIN + index as f32 * column_width)).abs() < 1e-3, "{:?}", cell);
    }
}
