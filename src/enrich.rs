//! Table rows with cells that are filled in after the first paint.
//!
//! Rows are built synchronously from records the screen already has. Cells
//! whose content needs another lookup start as `Loading` and are patched one
//! at a time as their lookups complete, in any order.

use std::collections::BTreeMap;
use crate::error::ApiError;
use crate::models::{Id, Student};

pub const LOADING: &str = "Loading…";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Subjects,
    FeeSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Loading,
    Ready(String),
    Failed(String),
    /// Record has nothing to look up (e.g. no fee structure assigned).
    Absent,
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Loading => LOADING,
            Cell::Ready(text) | Cell::Failed(text) => text,
            Cell::Absent => "-",
        }
    }
}

pub trait Record {
    fn row_id(&self) -> &Id;
}

impl Record for Student {
    fn row_id(&self) -> &Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub record: T,
    cells: BTreeMap<Slot, Cell>,
}

impl<T> Row<T> {
    pub fn cell(&self, slot: Slot) -> &Cell {
        self.cells.get(&slot).unwrap_or(&Cell::Absent)
    }
}

/// One lookup the screen must run for a row cell.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichRequest {
    pub generation: u64,
    pub row_id: Id,
    pub slot: Slot,
    pub key: Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    generation: u64,
    rows: Vec<Row<T>>,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self { generation: 0, rows: Vec::new() }
    }
}

impl<T: Record> ListView<T> {
    /// Replaces all rows. `plan` names the lookup key for each slot of a
    /// record; `cached` resolves keys that are already known so those cells
    /// are complete immediately. Returns the lookups still outstanding.
    pub fn load<P, C>(&mut self, records: Vec<T>, plan: P, cached: C) -> Vec<EnrichRequest>
    where
        P: Fn(&T) -> Vec<(Slot, Option<Id>)>,
        C: Fn(Slot, &Id) -> Option<String>,
    {
        self.generation += 1;
        let generation = self.generation;
        let mut requests = Vec::new();
        self.rows = records
            .into_iter()
            .map(|record| {
                let mut cells = BTreeMap::new();
                for (slot, key) in plan(&record) {
                    let cell = match key {
                        None => Cell::Absent,
                        Some(key) => match cached(slot, &key) {
                            Some(text) => Cell::Ready(text),
                            None => {
                                requests.push(EnrichRequest {
                                    generation,
                                    row_id: record.row_id().clone(),
                                    slot,
                                    key,
                                });
                                Cell::Loading
                            }
                        },
                    };
                    cells.insert(slot, cell);
                }
                Row { record, cells }
            })
            .collect();
        requests
    }

    /// Patches one cell. Results from an earlier `load` or for rows that no
    /// longer exist are ignored and `false` is returned.
    pub fn apply(
        &mut self,
        generation: u64,
        row_id: &Id,
        slot: Slot,
        result: Result<String, ApiError>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        let Some(row) = self.rows.iter_mut().find(|r| r.record.row_id() == row_id) else {
            return false;
        };
        let cell = match result {
            Ok(text) => Cell::Ready(text),
            Err(ApiError::NotFound) => Cell::Absent,
            Err(err) => Cell::Failed(err.user_message()),
        };
        row.cells.insert(slot, cell);
        true
    }

    pub fn remove(&mut self, row_id: &Id) {
        self.rows.retain(|r| r.record.row_id() != row_id);
    }

    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lookup plan for the student table: subjects come from the course, the
/// fee summary from the assigned fee structure.
pub fn student_plan(student: &Student) -> Vec<(Slot, Option<Id>)> {
    vec![
        (Slot::Subjects, student.course_id.clone()),
        (Slot::FeeSummary, student.fee_structure_id.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, course: Option<&str>, fee: Option<&str>) -> Student {
        Student {
            id: Id::from(id),
            first_name: "Test".into(),
            last_name: id.into(),
            email: format!("{}@example.com", id),
            phone: None,
            course_id: course.map(Id::from),
            batch_id: None,
            fee_structure_id: fee.map(Id::from),
            course_name: None,
            batch_name: None,
            status: None,
        }
    }

    #[test]
    fn rows_render_with_loading_cells_and_requests() {
        let mut list = ListView::default();
        let requests = list.load(
            vec![student("s1", Some("c1"), Some("f1")), student("s2", Some("c1"), None)],
            student_plan,
            |_, _| None,
        );

        assert_eq!(list.rows().len(), 2);
        assert_eq!(requests.len(), 3);
        assert_eq!(list.rows()[0].cell(Slot::Subjects), &Cell::Loading);
        assert_eq!(list.rows()[0].cell(Slot::Subjects).text(), LOADING);
        assert_eq!(list.rows()[1].cell(Slot::FeeSummary), &Cell::Absent);
    }

    #[test]
    fn cached_lookups_complete_immediately() {
        let mut list = ListView::default();
        let requests = list.load(
            vec![student("s1", Some("c1"), Some("f1"))],
            student_plan,
            |slot, _| (slot == Slot::Subjects).then(|| "Maths, Physics".to_string()),
        );
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].slot, Slot::FeeSummary);
        assert_eq!(list.rows()[0].cell(Slot::Subjects), &Cell::Ready("Maths, Physics".into()));
    }

    #[test]
    fn cells_resolve_out_of_order_and_idempotently() {
        let mut list = ListView::default();
        let requests = list.load(
            vec![student("s1", Some("c1"), None), student("s2", Some("c2"), None)],
            student_plan,
            |_, _| None,
        );
        let generation = requests[0].generation;

        assert!(list.apply(generation, &Id::from("s2"), Slot::Subjects, Ok("Biology".into())));
        assert!(list.apply(generation, &Id::from("s1"), Slot::Subjects, Ok("Maths".into())));
        assert!(list.apply(generation, &Id::from("s1"), Slot::Subjects, Ok("Maths".into())));

        assert_eq!(list.rows()[0].cell(Slot::Subjects).text(), "Maths");
        assert_eq!(list.rows()[1].cell(Slot::Subjects).text(), "Biology");
    }

    #[test]
    fn results_for_previous_load_are_dropped() {
        let mut list = ListView::default();
        let old = list.load(vec![student("s1", Some("c1"), None)], student_plan, |_, _| None);
        list.load(vec![student("s1", Some("c1"), None)], student_plan, |_, _| None);

        assert!(!list.apply(old[0].generation, &Id::from("s1"), Slot::Subjects, Ok("x".into())));
        assert_eq!(list.rows()[0].cell(Slot::Subjects), &Cell::Loading);
    }

    #[test]
    fn failed_lookup_shows_message_in_its_cell_only() {
        let mut list = ListView::default();
        let requests = list.load(vec![student("s1", Some("c1"), Some("f1"))], student_plan, |_, _| None);
        list.apply(
            requests[0].generation,
            &Id::from("s1"),
            Slot::FeeSummary,
            Err(ApiError::Network("timeout".into())),
        );
        assert!(matches!(list.rows()[0].cell(Slot::FeeSummary), Cell::Failed(_)));
        assert_eq!(list.rows()[0].cell(Slot::Subjects), &Cell::Loading);
    }
}
