//! Course → Batch → (Fee structures, Subjects) dependent selection.
//!
//! Pure state; the screen issues the fetches described by the returned
//! requests and feeds the results back in. Every request carries the
//! generation it was issued under, and results from an older generation
//! are dropped, so a slow answer for a course the user already moved away
//! from can never overwrite the current selection.

use thiserror::Error;
use tracing::debug;
use crate::error::ApiError;
use crate::models::{Batch, FeeStructure, Id, Subject};

pub const BATCH_PLACEHOLDER: &str = "Select course first";
pub const NO_BATCHES: &str = "No batches available";

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOptions {
    /// No course selected; selector disabled with its placeholder.
    Disabled,
    Loading,
    Loaded(Vec<Batch>),
    Empty,
    Failed(String),
}

impl BatchOptions {
    pub fn is_enabled(&self) -> bool {
        matches!(self, BatchOptions::Loaded(_))
    }

    pub fn batches(&self) -> &[Batch] {
        match self {
            BatchOptions::Loaded(batches) => batches,
            _ => &[],
        }
    }

    pub fn placeholder(&self) -> String {
        match self {
            BatchOptions::Disabled => BATCH_PLACEHOLDER.to_string(),
            BatchOptions::Loading => "Loading…".to_string(),
            BatchOptions::Loaded(_) => "Select batch".to_string(),
            BatchOptions::Empty => NO_BATCHES.to_string(),
            BatchOptions::Failed(message) => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DependentView<T> {
    Idle,
    Loading,
    Ready(T),
    Empty,
    Failed(String),
}

impl<T> DependentView<T> {
    fn from_result(result: Result<T, ApiError>, is_empty: impl Fn(&T) -> bool) -> Self {
        match result {
            Ok(value) if is_empty(&value) => DependentView::Empty,
            Ok(value) => DependentView::Ready(value),
            Err(ApiError::NotFound) => DependentView::Empty,
            Err(err) => DependentView::Failed(err.user_message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub course_id: Id,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependentRequest {
    pub course_id: Id,
    pub batch_id: Id,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CascadeError {
    #[error("select a course first")]
    NoCourse,
    #[error("batches are not available for this course yet")]
    BatchesNotReady,
    #[error("batch {0} is not offered for the selected course")]
    UnknownBatch(Id),
}

impl From<CascadeError> for ApiError {
    fn from(err: CascadeError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    course: Option<Id>,
    batch: Option<Id>,
    batch_options: BatchOptions,
    fees: DependentView<Vec<FeeStructure>>,
    subjects: DependentView<Vec<Subject>>,
    /// Bumped on every course change.
    course_generation: u64,
    /// Bumped on every batch change.
    batch_generation: u64,
    /// Batch to select once the batches of the replayed course arrive.
    pending_batch: Option<Id>,
}

impl Default for Cascade {
    fn default() -> Self {
        Self {
            course: None,
            batch: None,
            batch_options: BatchOptions::Disabled,
            fees: DependentView::Idle,
            subjects: DependentView::Idle,
            course_generation: 0,
            batch_generation: 0,
            pending_batch: None,
        }
    }
}

impl Cascade {
    pub fn course(&self) -> Option<&Id> {
        self.course.as_ref()
    }

    pub fn batch(&self) -> Option<&Id> {
        self.batch.as_ref()
    }

    pub fn batch_options(&self) -> &BatchOptions {
        &self.batch_options
    }

    pub fn fees(&self) -> &DependentView<Vec<FeeStructure>> {
        &self.fees
    }

    pub fn subjects(&self) -> &DependentView<Vec<Subject>> {
        &self.subjects
    }

    /// False while an edit replay is still waiting for its batch list.
    pub fn is_interactive(&self) -> bool {
        self.pending_batch.is_none()
    }

    pub fn selected_batch(&self) -> Option<&Batch> {
        let id = self.batch.as_ref()?;
        self.batch_options.batches().iter().find(|b| &b.id == id)
    }

    /// Changes the course. Batch selection and every dependent view are reset
    /// whatever the new value is; a request is returned only for `Some`.
    pub fn select_course(&mut self, course: Option<Id>) -> Option<BatchRequest> {
        self.course_generation += 1;
        self.batch_generation += 1;
        self.batch = None;
        self.pending_batch = None;
        self.fees = DependentView::Idle;
        self.subjects = DependentView::Idle;
        self.course = course;
        match &self.course {
            Some(course_id) => {
                self.batch_options = BatchOptions::Loading;
                debug!(course = %course_id, generation = self.course_generation, "course selected");
                Some(BatchRequest { course_id: course_id.clone(), generation: self.course_generation })
            }
            None => {
                self.batch_options = BatchOptions::Disabled;
                None
            }
        }
    }

    /// Applies the batch list for a course request. Returns false when the
    /// result belongs to a superseded selection and was ignored.
    pub fn batches_loaded(&mut self, generation: u64, result: Result<Vec<Batch>, ApiError>) -> bool {
        if generation != self.course_generation || self.course.is_none() {
            debug!(generation, current = self.course_generation, "discarding stale batch list");
            return false;
        }
        self.batch_options = match result {
            Ok(batches) if batches.is_empty() => BatchOptions::Empty,
            Ok(batches) => BatchOptions::Loaded(batches),
            Err(ApiError::NotFound) => BatchOptions::Empty,
            Err(err) => BatchOptions::Failed(err.user_message()),
        };
        true
    }

    /// Starts the dependent fetch for the given batch.
    pub fn select_batch(&mut self, batch_id: Id) -> Result<DependentRequest, CascadeError> {
        let course_id = self.course.clone().ok_or(CascadeError::NoCourse)?;
        if !self.batch_options.is_enabled() {
            return Err(CascadeError::BatchesNotReady);
        }
        if !self.batch_options.batches().iter().any(|b| b.id == batch_id) {
            return Err(CascadeError::UnknownBatch(batch_id));
        }
        self.batch_generation += 1;
        self.batch = Some(batch_id.clone());
        self.fees = DependentView::Loading;
        self.subjects = DependentView::Loading;
        Ok(DependentRequest { course_id, batch_id, generation: self.batch_generation })
    }

    pub fn fees_loaded(&mut self, generation: u64, result: Result<Vec<FeeStructure>, ApiError>) -> bool {
        if generation != self.batch_generation {
            return false;
        }
        self.fees = DependentView::from_result(result, Vec::is_empty);
        true
    }

    pub fn subjects_loaded(&mut self, generation: u64, result: Result<Vec<Subject>, ApiError>) -> bool {
        if generation != self.batch_generation {
            return false;
        }
        self.subjects = DependentView::from_result(result, Vec::is_empty);
        true
    }

    /// Programmatic course-then-batch selection used when an existing record
    /// is opened for editing. The batch is applied by
    /// [`Cascade::batches_loaded_with_replay`] once it exists in the options.
    pub fn replay(&mut self, course: Id, batch: Option<Id>) -> Option<BatchRequest> {
        let request = self.select_course(Some(course));
        self.pending_batch = batch;
        request
    }

    /// Same as [`Cascade::batches_loaded`], then completes a pending replay.
    /// Returns the dependent request when the replayed batch was selected.
    pub fn batches_loaded_with_replay(
        &mut self,
        generation: u64,
        result: Result<Vec<Batch>, ApiError>,
    ) -> Option<DependentRequest> {
        if !self.batches_loaded(generation, result) {
            return None;
        }
        let pending = self.pending_batch.take()?;
        match self.select_batch(pending) {
            Ok(request) => Some(request),
            Err(err) => {
                debug!(%err, "replayed batch is no longer offered");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(id: &str, name: &str) -> Batch {
        Batch { id: Id::from(id), name: name.to_string(), start_date: None }
    }

    #[test]
    fn batch_selection_requests_exactly_that_pair() {
        let mut cascade = Cascade::default();
        let req = cascade.select_course(Some(Id::from("c1"))).unwrap();
        assert!(cascade.batches_loaded(req.generation, Ok(vec![batch("b1", "Morning"), batch("b2", "Evening")])));

        let dep = cascade.select_batch(Id::from("b2")).unwrap();
        assert_eq!(dep.course_id, Id::from("c1"));
        assert_eq!(dep.batch_id, Id::from("b2"));
        assert_eq!(cascade.fees(), &DependentView::Loading);
        assert_eq!(cascade.selected_batch().map(|b| b.name.as_str()), Some("Evening"));
    }

    #[test]
    fn clearing_course_disables_and_resets_batch() {
        let mut cascade = Cascade::default();
        let req = cascade.select_course(Some(Id::from("c1"))).unwrap();
        cascade.batches_loaded(req.generation, Ok(vec![batch("b1", "Morning")]));
        cascade.select_batch(Id::from("b1")).unwrap();

        assert!(cascade.select_course(None).is_none());
        assert_eq!(cascade.batch(), None);
        assert_eq!(cascade.batch_options(), &BatchOptions::Disabled);
        assert!(!cascade.batch_options().is_enabled());
        assert_eq!(cascade.batch_options().placeholder(), BATCH_PLACEHOLDER);
        assert_eq!(cascade.fees(), &DependentView::Idle);
    }

    #[test]
    fn batch_cannot_be_selected_without_course() {
        let mut cascade = Cascade::default();
        assert_eq!(cascade.select_batch(Id::from("b1")), Err(CascadeError::NoCourse));

        cascade.select_course(Some(Id::from("c1")));
        assert_eq!(cascade.select_batch(Id::from("b1")), Err(CascadeError::BatchesNotReady));
    }

    #[test]
    fn stale_batch_list_is_discarded() {
        let mut cascade = Cascade::default();
        let first = cascade.select_course(Some(Id::from("c1"))).unwrap();
        let second = cascade.select_course(Some(Id::from("c2"))).unwrap();

        assert!(!cascade.batches_loaded(first.generation, Ok(vec![batch("old", "Old")])));
        assert_eq!(cascade.batch_options(), &BatchOptions::Loading);

        assert!(cascade.batches_loaded(second.generation, Ok(vec![batch("new", "New")])));
        assert_eq!(cascade.batch_options().batches()[0].id, Id::from("new"));
    }

    #[test]
    fn empty_or_failed_batches_leave_selector_disabled() {
        let mut cascade = Cascade::default();
        let req = cascade.select_course(Some(Id::from("c1"))).unwrap();
        cascade.batches_loaded(req.generation, Ok(vec![]));
        assert_eq!(cascade.batch_options().placeholder(), NO_BATCHES);
        assert!(!cascade.batch_options().is_enabled());

        let req = cascade.select_course(Some(Id::from("c2"))).unwrap();
        cascade.batches_loaded(req.generation, Err(ApiError::Network("down".into())));
        assert!(matches!(cascade.batch_options(), BatchOptions::Failed(_)));
    }

    #[test]
    fn dependent_failure_degrades_to_message() {
        let mut cascade = Cascade::default();
        let req = cascade.select_course(Some(Id::from("c1"))).unwrap();
        cascade.batches_loaded(req.generation, Ok(vec![batch("b1", "Morning")]));
        let dep = cascade.select_batch(Id::from("b1")).unwrap();

        cascade.fees_loaded(
            dep.generation,
            Err(ApiError::Server { status: 500, message: "Fee lookup failed".into() }),
        );
        cascade.subjects_loaded(dep.generation, Ok(vec![]));

        assert_eq!(cascade.fees(), &DependentView::Failed("Fee lookup failed".into()));
        assert_eq!(cascade.subjects(), &DependentView::Empty);
    }

    #[test]
    fn late_fee_result_for_previous_batch_is_ignored() {
        let mut cascade = Cascade::default();
        let req = cascade.select_course(Some(Id::from("c1"))).unwrap();
        cascade.batches_loaded(req.generation, Ok(vec![batch("b1", "A"), batch("b2", "B")]));
        let first = cascade.select_batch(Id::from("b1")).unwrap();
        let second = cascade.select_batch(Id::from("b2")).unwrap();

        assert!(!cascade.fees_loaded(first.generation, Ok(vec![FeeStructure::default()])));
        assert_eq!(cascade.fees(), &DependentView::Loading);
        assert!(cascade.fees_loaded(second.generation, Ok(vec![FeeStructure::default()])));
    }

    #[test]
    fn edit_replay_selects_batch_after_options_arrive() {
        let mut cascade = Cascade::default();
        let req = cascade.replay(Id::from("c1"), Some(Id::from("b2"))).unwrap();
        assert!(!cascade.is_interactive());

        let dep = cascade
            .batches_loaded_with_replay(req.generation, Ok(vec![batch("b1", "A"), batch("b2", "B")]))
            .unwrap();
        assert_eq!((dep.course_id.as_str(), dep.batch_id.as_str()), ("c1", "b2"));
        assert!(cascade.is_interactive());
        assert_eq!(cascade.batch(), Some(&Id::from("b2")));
    }

    #[test]
    fn replay_of_withdrawn_batch_leaves_form_usable() {
        let mut cascade = Cascade::default();
        let req = cascade.replay(Id::from("c1"), Some(Id::from("gone"))).unwrap();
        assert!(cascade.batches_loaded_with_replay(req.generation, Ok(vec![batch("b1", "A")])).is_none());
        assert!(cascade.is_interactive());
        assert_eq!(cascade.batch(), None);
    }
}
