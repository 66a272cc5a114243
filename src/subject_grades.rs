use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::session::{columns, TutorGroup};

/// Grade labels which denote administrative lines of the spreadsheet instead of actual grades.
pub const RESERVED_GRADE_LABELS: [&str; 3] = ["Compensation", "CRM", "Content Task"];

/// The sessions given by a tutor for one subject at one grade, accumulated over all of the tutor's rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGradePair {
    /// The 1-based position of the pair within the tutor's own record.
    pub index: usize,
    /// The subject followed by the grade, such as `Math G5`.
    pub description: String,
    pub total_sessions: f64,
    pub session_price: i64,
    pub total_sessions_price: i64,
}

/// A grade is specialized when it has at least one letter (letter numbers such as `Ⅻ` included),
/// and it is not one of the reserved administrative labels. Digits alone, in any script, are not.
pub fn is_specialized_grade(grade: &str) -> bool {
    grade.chars().any(char::is_alphabetic) && !RESERVED_GRADE_LABELS.contains(&grade)
}

/// The running sums of one pair while the rows of a group are scanned.
#[derive(Debug, Default)]
struct PairAccumulator {
    description: String,
    total_sessions: f64,
    session_price: f64,
    total_sessions_price: f64,
}

/// Collects the specialized subject/grade pairs of a tutor, in the order they are first encountered.
///
/// Every row contributes up to three slots, all sharing the row's grade. The session count,
/// the session price and the total price of a slot are added to the bucket of its pair.
pub fn collect_subject_grades(group: &TutorGroup) -> Result<Vec<SubjectGradePair>, ContextError> {
    let mut accumulators: Vec<PairAccumulator> = Vec::new();

    for row in &group.rows {
        let grade = row.text(columns::GRADE)?;
        if !is_specialized_grade(&grade) {
            continue;
        }

        for slot in 1..=columns::SUBJECT_SLOTS {
            let subject = row.text(&columns::subject(slot))?;
            if subject.is_empty() {
                continue;
            }

            let description = format!("{subject} {grade}");
            let position = match accumulators
                .iter()
                .position(|accumulator| accumulator.description == description)
            {
                Some(position) => position,
                None => {
                    accumulators.push(PairAccumulator {
                        description,
                        ..PairAccumulator::default()
                    });
                    accumulators.len() - 1
                }
            };

            let accumulator = &mut accumulators[position];
            accumulator.total_sessions += row.number(&columns::total_sessions(slot))?;
            accumulator.session_price += row.number(&columns::session_price(slot))?;
            accumulator.total_sessions_price += row.number(&columns::total_sessions_price(slot))?;
        }
    }

    Ok(accumulators
        .into_iter()
        .enumerate()
        .map(|(position, accumulator)| SubjectGradePair {
            index: position + 1,
            description: accumulator.description,
            total_sessions: accumulator.total_sessions,
            session_price: round_amount(accumulator.session_price),
            total_sessions_price: round_amount(accumulator.total_sessions_price),
        })
        .collect())
}

/// Rounds a monetary amount to a whole number of currency units.
pub fn round_amount(amount: f64) -> i64 {
    amount.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialized_grades() {
        assert!(is_specialized_grade("G5"));
        assert!(is_specialized_grade("الصف الخامس"));
        assert!(is_specialized_grade("KG2"));
        assert!(!is_specialized_grade("5"));
        assert!(!is_specialized_grade("12 - 3"));
        assert!(!is_specialized_grade(""));
        assert!(!is_specialized_grade("Compensation"));
        assert!(!is_specialized_grade("CRM"));
        assert!(!is_specialized_grade("Content Task"));
    }

    #[test]
    fn arabic_indic_digits_are_not_specialized() {
        assert!(!is_specialized_grade("٥"));
        assert!(!is_specialized_grade("²"));
    }

    #[test]
    fn roman_numeral_grades_are_specialized() {
        assert!(is_specialized_grade("Ⅻ"));
        assert!(is_specialized_grade("Grade Ⅳ"));
    }
}
