use std::path::PathBuf;
use std::sync::Arc;
use iced_aw::date_picker::Date;
use crate::app::state::{CascadeTarget, Screen};
use crate::attendance::ReportMonth;
use crate::config::SessionConfig;
use crate::enrich::Slot;
use crate::error::ApiError;
use crate::models::{
    AttendanceRow, Batch, Course, Enrollment, FeeStructure, FeedbackStatus, Feedback, Id,
    LoginResponse, Schedule, Student, Subject, UserType,
};

#[derive(Debug, Clone)]
pub enum Message {
    NoOp,
    GoTo(Screen),
    Logout,
    // Configuration
    ConfigReady(Arc<SessionConfig>),
    LogoLoaded(Result<Vec<u8>, ApiError>),
    RefreshConfig,
    ConfigRefreshed(Result<Arc<SessionConfig>, ApiError>),
    ThemeSelected(&'static str),
    // Login
    LoginEmailChanged(String),
    LoginPasswordChanged(String),
    LoginAsUserToggled(bool),
    LoginPressed,
    LoggedIn(Result<LoginResponse, ApiError>),
    // Activation
    ActivateEmailChanged(String),
    ActivateTokenChanged(String),
    ActivatePasswordChanged(String),
    ActivateConfirmChanged(String),
    ActivatePressed,
    Activated(Result<String, ApiError>),
    // Courses and cascades
    CoursesLoaded(Result<Vec<Course>, ApiError>),
    CascadeCourseSelected(CascadeTarget, Option<Course>),
    CascadeBatchSelected(CascadeTarget, Batch),
    CascadeBatchesLoaded(CascadeTarget, u64, Result<Vec<Batch>, ApiError>),
    CascadeFeesLoaded(CascadeTarget, u64, Result<Vec<FeeStructure>, ApiError>),
    CascadeSubjectsLoaded(CascadeTarget, u64, Result<Vec<Subject>, ApiError>),
    // Student list
    StudentsLoaded(Result<Vec<Student>, ApiError>),
    CellEnriched {
        generation: u64,
        row_id: Id,
        slot: Slot,
        result: Result<String, ApiError>,
    },
    DeleteStudent(Id),
    StudentDeleted(Id, Result<(), ApiError>),
    // Student edit form
    EditStudent(Id),
    StudentLoaded(Id, Result<Student, ApiError>),
    FormFirstNameChanged(String),
    FormLastNameChanged(String),
    FormEmailChanged(String),
    FormPhoneChanged(String),
    FormPasswordChanged(String),
    FormConfirmPasswordChanged(String),
    FormFeeStructureSelected(FeeStructure),
    SaveStudent,
    StudentSaved(Result<(), ApiError>),
    CancelEdit,
    // Fees
    MyFeeLoaded(Result<Option<Arc<FeeStructure>>, ApiError>),
    // Attendance
    AttendanceUserTypeSelected(UserType),
    PreviousMonth,
    NextMonth,
    ChooseMonth,
    CancelMonth,
    SubmitMonth(Date),
    AttendanceLoaded(ReportMonth, UserType, Result<Vec<AttendanceRow>, ApiError>),
    ExportAttendance,
    AttendanceExported(Result<PathBuf, String>),
    // Feedback
    FeedbackLoaded(Result<Vec<Feedback>, ApiError>),
    FeedbackFilterSelected(Option<FeedbackStatus>),
    FeedbackResponseChanged(Id, String),
    SetFeedbackStatus(Id, FeedbackStatus),
    FeedbackUpdated(Id, FeedbackStatus, Option<String>, Result<(), ApiError>),
    DeleteFeedback(Id),
    FeedbackDeleted(Id, Result<(), ApiError>),
    // Mark entry
    SchedulesLoaded(Result<Vec<Schedule>, ApiError>),
    MarkSubjectSelected(Option<Subject>),
    ScheduleSelected(Schedule),
    EnrollmentsLoaded(Schedule, Result<Vec<Enrollment>, ApiError>),
    MarkChanged(usize, String),
    AbsentToggled(usize, bool),
    RemarksChanged(usize, String),
    SaveMarks,
    MarksSaved(Result<(), ApiError>),
}

