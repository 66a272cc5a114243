use crate::consolidate::TutorInvoiceRecord;
use crate::session::CellValue;
use crate::subject_grades::SubjectGradePair;

/// The placeholder written in the description column of a pair a tutor does not have.
pub const MISSING_PAIR_PLACEHOLDER: &str = "--";

/// The consolidated records flattened into a rectangular table, one row per tutor.
///
/// The pair columns are repeated for as many pairs as the tutor with the most pairs has,
/// shorter records are padded with placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

const FIXED_HEADERS: [&str; 28] = [
    "ID",
    "Full Name",
    "Address",
    "Invoice Number",
    "Invoice Date",
    "Mobile",
    "Email Address",
    "Subjects",
    "Accrual Month",
    "Total Sessions",
    "Content Special Tasks",
    "Content Special Tasks Price",
    "Content Special Tasks Total",
    "CRM Duration",
    "CRM Price",
    "CRM Payment",
    "Demo No.",
    "Demo Price",
    "Demo Total",
    "Demo Month",
    "Total Compensation",
    "Total Salary",
    "Bank Account Name",
    "Bank Name",
    "Bank Address",
    "Account Number",
    "Bank Account Number (IBAN)",
    "Swift",
];

impl ConsolidatedTable {
    pub fn from_records(records: &[TutorInvoiceRecord]) -> Self {
        let maximum_pairs = records
            .iter()
            .map(|record| record.subject_grades.len())
            .max()
            .unwrap_or(0);

        let mut headers: Vec<String> = FIXED_HEADERS
            .iter()
            .map(|header| header.to_string())
            .collect();
        for index in 1..=maximum_pairs {
            headers.push(index.to_string());
            headers.push(format!("Total Sessions {index}"));
            headers.push(format!("Session Price {index}"));
            headers.push(format!("Total Sessions Price {index}"));
        }

        let rows = records
            .iter()
            .map(|record| {
                let mut row = fixed_cells(record);
                for position in 0..maximum_pairs {
                    row.extend(pair_cells(record.subject_grades.get(position)));
                }
                row
            })
            .collect();

        ConsolidatedTable { headers, rows }
    }

    /// The number of pair column groups of the table.
    pub fn pair_column_count(&self) -> usize {
        (self.headers.len() - FIXED_HEADERS.len()) / 4
    }
}

fn fixed_cells(record: &TutorInvoiceRecord) -> Vec<CellValue> {
    let text = |value: &str| CellValue::Text(value.to_string());
    let amount = |value: i64| CellValue::Number(value as f64);

    vec![
        text(&record.id),
        text(&record.full_name),
        text(&record.address),
        text(&record.invoice_number),
        text(&record.invoice_date),
        text(&record.mobile),
        text(&record.email_address),
        text(&record.subjects),
        text(&record.accrual_month),
        CellValue::Number(record.total_sessions),
        CellValue::Number(record.content_special_tasks),
        amount(record.content_special_tasks_price),
        amount(record.content_special_tasks_total),
        CellValue::Number(record.crm_duration),
        amount(record.crm_price),
        amount(record.crm_payment),
        CellValue::Number(record.demo_count),
        amount(record.demo_price),
        amount(record.demo_total),
        text(&record.demo_month),
        amount(record.total_compensation),
        amount(record.total_salary),
        text(&record.bank_account_name),
        text(&record.bank_name),
        text(&record.bank_address),
        text(&record.account_number),
        text(&record.iban),
        text(&record.swift),
    ]
}

fn pair_cells(pair: Option<&SubjectGradePair>) -> [CellValue; 4] {
    match pair {
        Some(pair) => [
            CellValue::Text(pair.description.clone()),
            CellValue::Number(pair.total_sessions),
            CellValue::Number(pair.session_price as f64),
            CellValue::Number(pair.total_sessions_price as f64),
        ],
        None => [
            CellValue::Text(MISSING_PAIR_PLACEHOLDER.into()),
            CellValue::Number(0.0),
            CellValue::Number(0.0),
            CellValue::Number(0.0),
        ],
    }
}
