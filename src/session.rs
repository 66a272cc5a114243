use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// The column names of the session spreadsheet, as they read after normalization.
pub mod columns {
    pub const ID: &str = "ID";
    pub const FULL_NAME: &str = "Full Name";
    pub const ADDRESS: &str = "Address";
    pub const INVOICE_NUMBER: &str = "Invoice Number";
    pub const INVOICE_DATE: &str = "Invoice Date";
    pub const MOBILE: &str = "Mobile";
    pub const EMAIL_ADDRESS: &str = "Email Address";
    pub const GRADE: &str = "Grade";
    pub const TOTAL_SESSIONS_PER_GRADE: &str = "Total Sessions per Grade";
    pub const CONTENT_SPECIAL_TASKS: &str = "Content Special Tasks";
    pub const CONTENT_SPECIAL_TASKS_PRICE: &str = "Content Special Tasks Price";
    pub const CONTENT_SPECIAL_TOTAL: &str = "Content Special Total";
    pub const CRM_DURATION: &str = "CRM Duration";
    pub const CRM_PRICE: &str = "CRM Price";
    pub const CRM_PAYMENT: &str = "CRM Payment";
    pub const TOTAL_COMPENSATION: &str = "Total Compensation";
    pub const DEMO_COUNT: &str = "Demo No.";
    pub const DEMO_PRICE: &str = "Demo Price";
    pub const DEMO_TOTAL: &str = "Demo Total";
    pub const DEMO_MONTH: &str = "Demo Month";
    pub const TOTAL_SALARY: &str = "Total Salary";
    pub const BANK_ACCOUNT_NAME: &str = "Bank Account Name";
    pub const BANK_NAME: &str = "Bank Name";
    pub const ENGLISH_BANK_ADDRESS: &str = "English Bank Address";
    pub const ACCOUNT_NUMBER: &str = "Account Number";
    pub const IBAN: &str = "Bank Account Number (IBAN)";
    pub const SWIFT: &str = "Swift";
    pub const ACCRUAL_MONTH: &str = "Accrual Month";

    /// The number of subject slots a single spreadsheet row carries.
    pub const SUBJECT_SLOTS: usize = 3;

    pub fn subject(slot: usize) -> String {
        format!("Subject {slot}")
    }

    pub fn session_price(slot: usize) -> String {
        format!("Session Price {slot}")
    }

    pub fn total_sessions(slot: usize) -> String {
        format!("Total Sessions {slot}")
    }

    pub fn total_sessions_price(slot: usize) -> String {
        format!("Total Sessions Price {slot}")
    }

    /// Every column the input spreadsheet must provide, in the order they are reported when missing.
    pub fn required() -> Vec<String> {
        let mut required: Vec<String> = [
            ID,
            FULL_NAME,
            ADDRESS,
            INVOICE_NUMBER,
            INVOICE_DATE,
            MOBILE,
            EMAIL_ADDRESS,
        ]
        .iter()
        .map(|column| column.to_string())
        .collect();
        required.extend((1..=SUBJECT_SLOTS).map(subject));
        required.push(GRADE.into());
        required.push(TOTAL_SESSIONS_PER_GRADE.into());
        required.extend((1..=SUBJECT_SLOTS).map(session_price));
        required.extend((1..=SUBJECT_SLOTS).map(total_sessions));
        required.extend((1..=SUBJECT_SLOTS).map(total_sessions_price));
        required.extend(
            [
                CONTENT_SPECIAL_TASKS,
                CONTENT_SPECIAL_TASKS_PRICE,
                CONTENT_SPECIAL_TOTAL,
                CRM_DURATION,
                CRM_PRICE,
                CRM_PAYMENT,
                TOTAL_COMPENSATION,
                DEMO_COUNT,
                DEMO_PRICE,
                DEMO_TOTAL,
                DEMO_MONTH,
                TOTAL_SALARY,
                BANK_ACCOUNT_NAME,
                BANK_NAME,
                ENGLISH_BANK_ADDRESS,
                ACCOUNT_NUMBER,
                IBAN,
                SWIFT,
                ACCRUAL_MONTH,
            ]
            .iter()
            .map(|column| column.to_string()),
        );
        required
    }
}

/// The raw value of a single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// The textual representation of the cell, integral numbers are written without decimals
    /// so that phone and account numbers stored as numbers read as expected.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => format_number(*number),
        }
    }

    /// The numeric value of the cell, where empty cells and blank text count as zero.
    /// Returns `None` if the cell holds text which is not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => Some(0.0),
            CellValue::Number(number) => Some(*number),
            CellValue::Text(text) if text.trim().is_empty() => Some(0.0),
            CellValue::Text(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

/// Formats a number the way the invoice shows quantities, dropping a zero fractional part.
pub fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        let formatted = format!("{:.2}", number);
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// One row of the session spreadsheet, keyed by (normalized) column name.
///
/// A column absent from `cells` is missing, which is not the same thing as an empty cell:
/// reading an empty cell yields zero or the empty string, reading a missing one fails.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionRow {
    pub cells: BTreeMap<String, CellValue>,
}

impl SessionRow {
    pub fn new() -> Self {
        SessionRow::default()
    }

    /// Builder-style insertion of a cell, mostly useful when constructing rows in code.
    pub fn with<S: Into<String>>(mut self, column: S, value: CellValue) -> Self {
        self.cells.insert(column.into(), value);
        self
    }

    pub fn with_text<S: Into<String>, T: Into<String>>(self, column: S, text: T) -> Self {
        self.with(column, CellValue::Text(text.into()))
    }

    pub fn with_number<S: Into<String>>(self, column: S, number: f64) -> Self {
        self.with(column, CellValue::Number(number))
    }

    pub fn cell(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Reads the column as text, failing if the column is missing.
    pub fn text(&self, column: &str) -> Result<String, ContextError> {
        self.cell(column)
            .map(CellValue::as_text)
            .ok_or_else(|| missing_column(column))
    }

    /// Reads the column as a number, failing if the column is missing or holds non-numeric text.
    pub fn number(&self, column: &str) -> Result<f64, ContextError> {
        let cell = self.cell(column).ok_or_else(|| missing_column(column))?;
        cell.as_number().ok_or_else(|| {
            ContextError::with_context(format!(
                "The column {:?} holds the non-numeric value {:?}",
                column,
                cell.as_text()
            ))
        })
    }

    /// The tutor identifier of the row, if the row carries a non-blank one.
    pub fn tutor_id(&self) -> Option<String> {
        self.cell(columns::ID)
            .filter(|cell| !cell.is_blank())
            .map(CellValue::as_text)
    }
}

fn missing_column(column: &str) -> ContextError {
    ContextError::with_context(format!("Missing the column {:?}", column))
}

/// All the rows belonging to one tutor, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorGroup {
    pub tutor_id: String,
    pub rows: Vec<SessionRow>,
}

impl TutorGroup {
    /// The value of the first row carrying the column, failing if no row of the group carries it.
    pub fn first_text(&self, column: &str) -> Result<String, ContextError> {
        self.rows
            .iter()
            .find_map(|row| row.cell(column))
            .map(CellValue::as_text)
            .ok_or_else(|| missing_column(column))
    }

    /// Sums the column over every row of the group.
    pub fn sum(&self, column: &str) -> Result<f64, ContextError> {
        self.rows.iter().map(|row| row.number(column)).sum()
    }

    /// The first non-zero value of the column within the group, zero if there is none.
    pub fn first_non_zero(&self, column: &str) -> Result<f64, ContextError> {
        for row in &self.rows {
            let value = row.number(column)?;
            if value != 0.0 {
                return Ok(value);
            }
        }
        Ok(0.0)
    }

    /// The first non-empty text of the column within the group, empty if there is none.
    pub fn first_non_empty(&self, column: &str) -> Result<String, ContextError> {
        for row in &self.rows {
            let value = row.text(column)?;
            if !value.is_empty() {
                return Ok(value);
            }
        }
        Ok(String::new())
    }
}

/// Groups the rows by tutor identifier, in ascending identifier order.
///
/// Rows without an identifier cannot be attributed to any tutor: they are logged and dropped.
pub fn group_by_tutor(rows: Vec<SessionRow>) -> Vec<TutorGroup> {
    let mut groups: BTreeMap<GroupKey, Vec<SessionRow>> = BTreeMap::new();

    for (index, row) in rows.into_iter().enumerate() {
        match row.tutor_id() {
            Some(tutor_id) => groups.entry(GroupKey::new(tutor_id)).or_default().push(row),
            None => log::warn!(
                "Dropping the spreadsheet row {} because it has no tutor identifier",
                index + 2
            ),
        }
    }

    groups
        .into_iter()
        .map(|(key, rows)| TutorGroup {
            tutor_id: key.tutor_id,
            rows,
        })
        .collect()
}

/// Orders identifiers numerically when they are numbers, lexicographically otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupKey {
    numeric: Option<i64>,
    tutor_id: String,
}

impl GroupKey {
    fn new(tutor_id: String) -> Self {
        GroupKey {
            numeric: tutor_id.parse::<i64>().ok(),
            tutor_id,
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.numeric, other.numeric) {
            (Some(left), Some(right)) => left
                .cmp(&right)
                .then_with(|| self.tutor_id.cmp(&other.tutor_id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => self.tutor_id.cmp(&other.tutor_id),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
