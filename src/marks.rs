use thiserror::Error;
use crate::error::ApiError;
use crate::models::{BulkMarks, Enrollment, Id, MarkRecord, Schedule};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkError {
    #[error("{student}: \"{input}\" is not a number")]
    NotANumber { student: String, input: String },
    #[error("{student}: marks must be between 0 and {max}")]
    OutOfRange { student: String, max: f64 },
    #[error("{student}: marks cannot be negative")]
    Negative { student: String },
    #[error("no students are enrolled for this exam")]
    NoStudents,
}

impl From<MarkError> for ApiError {
    fn from(err: MarkError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Editable row of the mark entry grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkEntry {
    pub student_id: Id,
    pub student_name: String,
    pub roll_number: Option<String>,
    pub input: String,
    pub absent: bool,
    pub remarks: String,
}

impl From<Enrollment> for MarkEntry {
    fn from(e: Enrollment) -> Self {
        Self {
            input: e.marks_obtained.map(format_mark).unwrap_or_default(),
            student_id: e.student_id,
            student_name: e.student_name,
            roll_number: e.roll_number,
            absent: e.is_absent,
            remarks: e.remarks.unwrap_or_default(),
        }
    }
}

fn format_mark(mark: f64) -> String {
    if mark.fract() == 0.0 { format!("{}", mark as i64) } else { format!("{}", mark) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkSheet {
    pub schedule: Schedule,
    pub entries: Vec<MarkEntry>,
}

impl MarkSheet {
    pub fn new(schedule: Schedule, enrollments: Vec<Enrollment>) -> Self {
        Self { schedule, entries: enrollments.into_iter().map(MarkEntry::from).collect() }
    }

    pub fn set_input(&mut self, index: usize, input: String) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.input = input;
        }
    }

    pub fn set_absent(&mut self, index: usize, absent: bool) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.absent = absent;
            if absent {
                entry.input.clear();
            }
        }
    }

    pub fn set_remarks(&mut self, index: usize, remarks: String) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.remarks = remarks;
        }
    }

    /// Builds the bulk-save payload. Every present student with a typed mark
    /// must be within `0..=max_marks`, or just non-negative when the exam has
    /// no maximum; an empty field is saved as "not entered".
    pub fn to_payload(&self) -> Result<BulkMarks, MarkError> {
        if self.entries.is_empty() {
            return Err(MarkError::NoStudents);
        }
        let max = self.schedule.max_marks.filter(|max| *max > 0.0);
        let mut marks = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let marks_obtained = if entry.absent || entry.input.trim().is_empty() {
                None
            } else {
                let value: f64 = entry.input.trim().parse().map_err(|_| MarkError::NotANumber {
                    student: entry.student_name.clone(),
                    input: entry.input.clone(),
                })?;
                match max {
                    Some(max) if !(0.0..=max).contains(&value) => {
                        return Err(MarkError::OutOfRange { student: entry.student_name.clone(), max });
                    }
                    None if value < 0.0 => {
                        return Err(MarkError::Negative { student: entry.student_name.clone() });
                    }
                    _ => {}
                }
                Some(value)
            };
            marks.push(MarkRecord {
                student_id: entry.student_id.clone(),
                marks_obtained,
                is_absent: entry.absent,
                remarks: Some(entry.remarks.trim().to_string()).filter(|r| !r.is_empty()),
            });
        }
        Ok(BulkMarks { marks })
    }

    /// Present students below the pass mark, for the summary line under the grid.
    pub fn failing_count(&self) -> usize {
        let Some(pass) = self.schedule.pass_marks else { return 0 };
        self.entries
            .iter()
            .filter(|e| !e.absent)
            .filter_map(|e| e.input.trim().parse::<f64>().ok())
            .filter(|m| *m < pass)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule {
            id: Id::from("sch1"),
            exam_name: "Midterm".into(),
            subject_id: None,
            subject_name: "Maths".into(),
            course_id: None,
            batch_id: None,
            course_name: None,
            batch_name: None,
            max_marks: Some(100.0),
            pass_marks: Some(35.0),
            exam_date: None,
        }
    }

    fn enrollment(id: &str, marks: Option<f64>) -> Enrollment {
        Enrollment {
            student_id: Id::from(id),
            student_name: format!("Student {}", id),
            roll_number: None,
            marks_obtained: marks,
            is_absent: false,
            remarks: None,
        }
    }

    #[test]
    fn existing_marks_prefill_inputs() {
        let sheet = MarkSheet::new(schedule(), vec![enrollment("1", Some(72.0)), enrollment("2", Some(40.5))]);
        assert_eq!(sheet.entries[0].input, "72");
        assert_eq!(sheet.entries[1].input, "40.5");
    }

    #[test]
    fn out_of_range_marks_block_submission() {
        let mut sheet = MarkSheet::new(schedule(), vec![enrollment("1", None)]);
        sheet.set_input(0, "101".into());
        assert_eq!(
            sheet.to_payload(),
            Err(MarkError::OutOfRange { student: "Student 1".into(), max: 100.0 })
        );
        sheet.set_input(0, "-1".into());
        assert!(sheet.to_payload().is_err());
    }

    #[test]
    fn missing_maximum_only_rejects_negative_marks() {
        for max_marks in [None, Some(0.0)] {
            let mut sheet = MarkSheet::new(Schedule { max_marks, ..schedule() }, vec![enrollment("1", None)]);
            sheet.set_input(0, "140".into());
            assert_eq!(sheet.to_payload().unwrap().marks[0].marks_obtained, Some(140.0));
            sheet.set_input(0, "-3".into());
            assert_eq!(sheet.to_payload(), Err(MarkError::Negative { student: "Student 1".into() }));
        }
    }

    #[test]
    fn schedule_without_max_marks_deserializes_as_unbounded() {
        let schedule: Schedule =
            serde_json::from_str(r#"{"id":5,"exam_name":"Quiz","subject_name":"Art"}"#).unwrap();
        assert_eq!(schedule.max_marks, None);
        let schedule: Schedule = serde_json::from_str(r#"{"id":6,"max_marks":"50"}"#).unwrap();
        assert_eq!(schedule.max_marks, Some(50.0));
    }

    #[test]
    fn non_numeric_marks_block_submission() {
        let mut sheet = MarkSheet::new(schedule(), vec![enrollment("1", None)]);
        sheet.set_input(0, "abc".into());
        assert!(matches!(sheet.to_payload(), Err(MarkError::NotANumber { .. })));
    }

    #[test]
    fn absent_students_are_saved_without_marks() {
        let mut sheet = MarkSheet::new(schedule(), vec![enrollment("1", Some(50.0)), enrollment("2", None)]);
        sheet.set_absent(0, true);
        sheet.set_input(1, "88".into());
        sheet.set_remarks(1, " good ".into());

        let payload = sheet.to_payload().unwrap();
        assert_eq!(payload.marks[0].marks_obtained, None);
        assert!(payload.marks[0].is_absent);
        assert_eq!(payload.marks[1].marks_obtained, Some(88.0));
        assert_eq!(payload.marks[1].remarks.as_deref(), Some("good"));
    }

    #[test]
    fn failing_count_uses_pass_marks() {
        let sheet = MarkSheet::new(schedule(), vec![enrollment("1", Some(20.0)), enrollment("2", Some(60.0))]);
        assert_eq!(sheet.failing_count(), 1);
    }

    #[test]
    fn empty_enrollment_cannot_be_saved() {
        assert_eq!(MarkSheet::new(schedule(), vec![]).to_payload(), Err(MarkError::NoStudents));
    }
}
