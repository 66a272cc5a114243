use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::normalize::{normalize_space, SEPARATOR};
use crate::pipeline::BatchProgress;
use crate::session::{columns, TutorGroup};
use crate::subject_grades::{collect_subject_grades, round_amount, SubjectGradePair};

/// The consolidated, invoice-ready view of all the rows of one tutor.
///
/// Profile fields come from the first row of the group, quantities are summed over the group,
/// and fields which are filled in on a single row take the first non-zero (or non-empty) value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorInvoiceRecord {
    pub id: String,
    pub full_name: String,
    pub address: String,
    pub invoice_number: String,
    pub invoice_date: String,
    pub mobile: String,
    pub email_address: String,
    pub subjects: String,
    pub accrual_month: String,
    pub total_sessions: f64,
    pub content_special_tasks: f64,
    pub content_special_tasks_price: i64,
    pub content_special_tasks_total: i64,
    pub crm_duration: f64,
    pub crm_price: i64,
    pub crm_payment: i64,
    pub demo_count: f64,
    pub demo_price: i64,
    pub demo_total: i64,
    pub demo_month: String,
    pub total_compensation: i64,
    pub total_salary: i64,
    pub bank_account_name: String,
    pub bank_name: String,
    pub bank_address: String,
    pub account_number: String,
    pub iban: String,
    pub swift: String,
    pub subject_grades: Vec<SubjectGradePair>,
}

/// The profile columns which are expected to hold the same value on every row of a tutor.
pub const PROFILE_COLUMNS: [&str; 13] = [
    columns::FULL_NAME,
    columns::ADDRESS,
    columns::INVOICE_NUMBER,
    columns::INVOICE_DATE,
    columns::MOBILE,
    columns::EMAIL_ADDRESS,
    columns::ACCRUAL_MONTH,
    columns::BANK_ACCOUNT_NAME,
    columns::BANK_NAME,
    columns::ENGLISH_BANK_ADDRESS,
    columns::ACCOUNT_NUMBER,
    columns::IBAN,
    columns::SWIFT,
];

/// Folds all the rows of a tutor into a single record.
///
/// Fails if a referenced column is missing from the group or holds a non-numeric value
/// where a number is expected; the caller decides whether to skip the tutor.
pub fn consolidate_group(group: &TutorGroup) -> Result<TutorInvoiceRecord, ContextError> {
    let record = TutorInvoiceRecord {
        id: group.tutor_id.clone(),
        full_name: group.first_text(columns::FULL_NAME)?,
        address: group.first_text(columns::ADDRESS)?,
        invoice_number: group.first_text(columns::INVOICE_NUMBER)?,
        invoice_date: group.first_text(columns::INVOICE_DATE)?,
        mobile: group.first_text(columns::MOBILE)?,
        email_address: group.first_text(columns::EMAIL_ADDRESS)?,
        subjects: collect_subjects(group)?,
        accrual_month: group.first_text(columns::ACCRUAL_MONTH)?,
        total_sessions: group.sum(columns::TOTAL_SESSIONS_PER_GRADE)?,
        content_special_tasks: group.sum(columns::CONTENT_SPECIAL_TASKS)?,
        content_special_tasks_price: round_amount(
            group.first_non_zero(columns::CONTENT_SPECIAL_TASKS_PRICE)?,
        ),
        content_special_tasks_total: round_amount(
            group.first_non_zero(columns::CONTENT_SPECIAL_TOTAL)?,
        ),
        crm_duration: round_to_hundredths(group.first_non_zero(columns::CRM_DURATION)?),
        crm_price: round_amount(group.first_non_zero(columns::CRM_PRICE)?),
        crm_payment: round_amount(group.first_non_zero(columns::CRM_PAYMENT)?),
        demo_count: group.sum(columns::DEMO_COUNT)?,
        demo_price: round_amount(group.first_non_zero(columns::DEMO_PRICE)?),
        demo_total: round_amount(group.first_non_zero(columns::DEMO_TOTAL)?),
        demo_month: group.first_non_empty(columns::DEMO_MONTH)?,
        total_compensation: round_amount(group.first_non_zero(columns::TOTAL_COMPENSATION)?),
        total_salary: round_amount(group.sum(columns::TOTAL_SALARY)?),
        bank_account_name: group.first_text(columns::BANK_ACCOUNT_NAME)?,
        bank_name: group.first_text(columns::BANK_NAME)?,
        bank_address: group.first_text(columns::ENGLISH_BANK_ADDRESS)?,
        account_number: group.first_text(columns::ACCOUNT_NUMBER)?,
        iban: group.first_text(columns::IBAN)?,
        swift: group.first_text(columns::SWIFT)?,
        subject_grades: collect_subject_grades(group)?,
    };

    Ok(record)
}

/// The distinct subjects of all three slots, joined by the separator.
fn collect_subjects(group: &TutorGroup) -> Result<String, ContextError> {
    let mut subjects: Vec<String> = Vec::new();
    for slot in 1..=columns::SUBJECT_SLOTS {
        let column = columns::subject(slot);
        for row in &group.rows {
            let subject = row.text(&column)?;
            if !subject.is_empty() && !subjects.contains(&subject) {
                subjects.push(subject);
            }
        }
    }

    Ok(normalize_space(&subjects.join(SEPARATOR)))
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A profile column whose value is not the same on every row of a tutor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDisagreement {
    pub column: String,
    /// The distinct non-empty values, in the order they appear.
    pub values: Vec<String>,
}

/// Finds the profile columns whose non-empty values disagree within the group.
///
/// Consolidation keeps the first row's value regardless, this only makes the inconsistency visible.
pub fn profile_disagreements(group: &TutorGroup) -> Vec<ProfileDisagreement> {
    PROFILE_COLUMNS
        .iter()
        .filter_map(|column| {
            let mut values: Vec<String> = Vec::new();
            for row in &group.rows {
                let Some(cell) = row.cell(column) else {
                    continue;
                };
                let value = cell.as_text();
                if !value.is_empty() && !values.contains(&value) {
                    values.push(value);
                }
            }

            (values.len() > 1).then(|| ProfileDisagreement {
                column: column.to_string(),
                values,
            })
        })
        .collect()
}

/// Consolidates every group, skipping (and logging) the tutors whose rows are malformed.
pub fn consolidate_all(
    groups: &[TutorGroup],
    progress: &mut BatchProgress,
) -> Vec<TutorInvoiceRecord> {
    let mut records = Vec::with_capacity(groups.len());

    for group in groups {
        for disagreement in profile_disagreements(group) {
            log::warn!(
                "The tutor {} has different values for {:?} across rows, keeping the first: {:?}",
                group.tutor_id,
                disagreement.column,
                disagreement.values
            );
            progress.inconsistent_profiles += 1;
        }

        match consolidate_group(group) {
            Ok(record) => {
                progress.consolidated += 1;
                records.push(record);
            }
            Err(error) => {
                let raw_group = serde_json::to_string(group)
                    .unwrap_or_else(|_| format!("{:?}", group.rows));
                log::error!(
                    "Unable to consolidate the tutor {}: {} in {}",
                    group.tutor_id,
                    error,
                    raw_group
                );
                progress.skipped_tutors.push(group.tutor_id.clone());
            }
        }
    }

    records
}
