use std::collections::HashMap;
use std::sync::Arc;
use iced::Theme;
use iced::widget::image;
use iced_aw::date_picker::Date;
use crate::attendance::ReportMonth;
use crate::cascade::{Cascade, DependentView};
use crate::config::{load_theme_override, Branding, SessionConfig};
use crate::enrich::ListView;
use crate::error::ApiError;
use crate::marks::MarkSheet;
use crate::models::{
    AttendanceRow, Course, Feedback, FeedbackStatus, FeeStructure, Id, Schedule, Student,
    StudentUpdate, UserType,
};
use crate::session::{Role, Session};
use crate::validate::{password_change, validate_email};

pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Login,
    Activate,
    Students,
    StudentForm,
    Fees,
    Attendance,
    Feedback,
    MarkEntry,
    Settings,
}

/// Which cascading selector a cascade message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeTarget {
    StudentForm,
    Fees,
    MarkEntry,
}

/// Edit form for one student. The cascade is replayed from the stored
/// course and batch when the record arrives.
#[derive(Debug, Clone, Default)]
pub struct StudentForm {
    pub student_id: Id,
    pub loaded: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub cascade: Cascade,
    pub fee_structure: Option<Id>,
    pub error: Option<String>,
    pub saving: bool,
}

impl StudentForm {
    pub fn new(student_id: Id) -> Self {
        Self { student_id, ..Self::default() }
    }

    pub fn fill(&mut self, student: &Student) {
        self.loaded = true;
        self.first_name = student.first_name.clone();
        self.last_name = student.last_name.clone();
        self.email = student.email.clone();
        self.phone = student.phone.clone().unwrap_or_default();
        self.fee_structure = student.fee_structure_id.clone();
    }

    /// Validates locally; nothing reaches the network unless this succeeds.
    pub fn to_update(&self) -> Result<StudentUpdate, ApiError> {
        if self.first_name.trim().is_empty() {
            return Err(ApiError::Validation("First name is required".into()));
        }
        validate_email(&self.email)?;
        let password = password_change(&self.password, &self.confirm_password)?;
        let phone = self.phone.trim();
        Ok(StudentUpdate {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
            course_id: self.cascade.course().cloned(),
            batch_id: self.cascade.batch().cloned(),
            fee_structure_id: self.fee_structure.clone(),
            password,
        })
    }
}

pub struct App {
    pub session: Session,
    pub current_screen: Screen,
    pub role: Option<Role>,
    /// Shown on the login screen after a forced sign-out.
    pub alert: Option<String>,
    //
    pub config: Option<Arc<SessionConfig>>,
    pub branding: Branding,
    pub theme_override: Option<Theme>,
    pub logo: Option<image::Handle>,
    pub settings_message: Option<String>,
    //
    pub login_email: String,
    pub login_password: String,
    pub login_as_user: bool,
    pub login_error: Option<String>,
    pub login_in_flight: bool,
    //
    pub activate_email: String,
    pub activate_token: String,
    pub activate_password: String,
    pub activate_confirm: String,
    pub activate_error: Option<String>,
    pub activate_message: Option<String>,
    //
    pub courses: Vec<Course>,
    pub students: ListView<Student>,
    pub students_loading: bool,
    pub students_error: Option<String>,
    pub student_form: Option<StudentForm>,
    //
    pub fees_cascade: Cascade,
    pub my_fee: DependentView<FeeStructure>,
    //
    pub attendance_user_type: UserType,
    pub attendance_month: ReportMonth,
    pub attendance_date: Date,
    pub show_month_picker: bool,
    pub attendance: DependentView<Vec<AttendanceRow>>,
    pub attendance_notice: Option<String>,
    //
    pub feedback: Vec<Feedback>,
    pub feedback_filter: Option<FeedbackStatus>,
    pub feedback_responses: HashMap<Id, String>,
    pub feedback_error: Option<String>,
    //
    pub schedules: Vec<Schedule>,
    pub marks_cascade: Cascade,
    pub marks_subject: Option<Id>,
    pub selected_schedule: Option<Id>,
    pub mark_sheet: DependentView<MarkSheet>,
    pub marks_notice: Option<String>,
    pub marks_saving: bool,
}

impl App {
    pub fn with_session(session: Session) -> Self {
        let today = Date::today();
        Self {
            role: session.role(),
            theme_override: load_theme_override(&session.store),
            session,
            current_screen: Screen::Login,
            alert: None,
            config: None,
            branding: Branding::default(),
            logo: None,
            settings_message: None,
            login_email: String::new(),
            login_password: String::new(),
            login_as_user: false,
            login_error: None,
            login_in_flight: false,
            activate_email: String::new(),
            activate_token: String::new(),
            activate_password: String::new(),
            activate_confirm: String::new(),
            activate_error: None,
            activate_message: None,
            courses: Vec::new(),
            students: ListView::default(),
            students_loading: false,
            students_error: None,
            student_form: None,
            fees_cascade: Cascade::default(),
            my_fee: DependentView::Idle,
            attendance_user_type: UserType::Student,
            attendance_month: ReportMonth { year: today.year, month: today.month },
            attendance_date: today,
            show_month_picker: false,
            attendance: DependentView::Idle,
            attendance_notice: None,
            feedback: Vec::new(),
            feedback_filter: None,
            feedback_responses: HashMap::new(),
            feedback_error: None,
            schedules: Vec::new(),
            marks_cascade: Cascade::default(),
            marks_subject: None,
            selected_schedule: None,
            mark_sheet: DependentView::Idle,
            marks_notice: None,
            marks_saving: false,
        }
    }

    pub fn title(&self) -> String {
        self.branding.title.clone()
    }

    pub fn theme(&self) -> Theme {
        self.theme_override.clone().unwrap_or_else(|| self.branding.theme.clone())
    }

    pub fn is_student(&self) -> bool {
        matches!(self.role, Some(Role::Student))
    }

    pub fn cascade_mut(&mut self, target: CascadeTarget) -> Option<&mut Cascade> {
        match target {
            CascadeTarget::StudentForm => self.student_form.as_mut().map(|f| &mut f.cascade),
            CascadeTarget::Fees => Some(&mut self.fees_cascade),
            CascadeTarget::MarkEntry => Some(&mut self.marks_cascade),
        }
    }

    /// Schedules matching the course, batch and subject picked on the mark entry screen.
    pub fn visible_schedules(&self) -> Vec<Schedule> {
        let course = self.marks_cascade.course();
        let batch = self.marks_cascade.batch();
        let subject = self.marks_subject.as_ref();
        self.schedules
            .iter()
            .filter(|s| course.is_none() || s.course_id.as_ref() == course)
            .filter(|s| batch.is_none() || s.batch_id.as_ref() == batch)
            .filter(|s| subject.is_none() || s.subject_id.as_ref() == subject)
            .cloned()
            .collect()
    }

    pub fn visible_feedback(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback
            .iter()
            .filter(|f| self.feedback_filter.is_none_or(|status| f.status == status))
    }

    /// Drops every piece of per-user state after logout or a forced sign-out.
    pub fn reset_user_state(&mut self) {
        self.role = None;
        self.login_password.clear();
        self.login_in_flight = false;
        self.courses.clear();
        self.students = ListView::default();
        self.students_error = None;
        self.student_form = None;
        self.fees_cascade = Cascade::default();
        self.my_fee = DependentView::Idle;
        self.attendance = DependentView::Idle;
        self.attendance_notice = None;
        self.feedback.clear();
        self.feedback_responses.clear();
        self.feedback_error = None;
        self.schedules.clear();
        self.marks_cascade = Cascade::default();
        self.marks_subject = None;
        self.selected_schedule = None;
        self.mark_sheet = DependentView::Idle;
        self.marks_notice = None;
        self.marks_saving = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> StudentForm {
        StudentForm {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.com".into(),
            ..StudentForm::new(Id::from("7"))
        }
    }

    #[test]
    fn empty_passwords_leave_password_out_of_the_update() {
        let update = form().to_update().unwrap();
        assert_eq!(update.password, None);
        let body = serde_json::to_value(&update).unwrap();
        assert!(body.get("password").is_none());
    }

    #[test]
    fn mismatched_passwords_are_rejected_before_sending() {
        let mut form = form();
        form.password = "Secret123".into();
        form.confirm_password = "Secret124".into();
        assert!(matches!(form.to_update(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut form = form();
        form.email = "not-an-email".into();
        assert!(form.to_update().is_err());
    }
}
