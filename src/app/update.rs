use std::sync::Arc;
use iced::Task;
use iced::widget::image;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, warn};
use crate::app::state::{CascadeTarget, Screen, StudentForm, SESSION_EXPIRED};
use crate::attendance::ReportMonth;
use crate::cascade::{BatchRequest, Cascade, DependentRequest, DependentView};
use crate::config::{save_theme_override, theme_from_str, Branding, SessionConfig};
use crate::enrich::{student_plan, EnrichRequest, Slot};
use crate::error::ApiError;
use crate::fees::fee_summary;
use crate::marks::MarkSheet;
use crate::models::{
    ActivationRequest, Credentials, FeedbackUpdate, Id, MonthlyAttendanceQuery, UserType,
};
use crate::report::write_attendance_excel;
use crate::screens::settings::INSTITUTE_THEME;
use crate::session::{subjects_text, Role, Session};
use crate::validate::{is_valid_uuid, password_change, validate_email};
use super::{App, Message};

impl App {
    pub fn new() -> (Self, Task<Message>) {
        Self::boot(Session::from_env())
    }

    /// Starts the configuration load and, for a remembered login, the home screen.
    pub fn boot(session: Session) -> (Self, Task<Message>) {
        let mut app = App::with_session(session);
        let config = app.session.config.clone();
        let init = Task::perform(async move { config.init().await }, Message::ConfigReady);
        let start = match app.role.clone() {
            Some(role) if app.session.is_authenticated() => app.open(home_screen(&role)),
            _ => Task::none(),
        };
        (app, Task::batch([init, start]))
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::NoOp => Task::none(),
            Message::GoTo(screen) => {
                if screen == Screen::Login || screen == Screen::Activate {
                    self.current_screen = screen;
                    self.login_error = None;
                    self.activate_error = None;
                    return Task::none();
                }
                self.open(screen)
            }
            Message::Logout => {
                self.session.end();
                self.reset_user_state();
                self.alert = None;
                self.current_screen = Screen::Login;
                Task::none()
            }

            Message::ConfigReady(config) => self.apply_config(config),
            Message::LogoLoaded(result) => {
                match result {
                    Ok(bytes) => self.logo = Some(image::Handle::from_bytes(bytes)),
                    Err(err) => {
                        warn!(%err, "institute logo unavailable");
                        self.logo = None;
                    }
                }
                Task::none()
            }
            Message::RefreshConfig => {
                self.settings_message = None;
                let config = self.session.config.clone();
                Task::perform(async move { config.refresh().await }, Message::ConfigRefreshed)
            }
            // Settings may be closed to some roles; a refusal here never signs the user out.
            Message::ConfigRefreshed(result) => {
                match result {
                    Ok(config) => {
                        self.settings_message = Some("Configuration reloaded.".to_string());
                        self.apply_config(config)
                    }
                    Err(err) => {
                        self.settings_message = Some(err.user_message());
                        Task::none()
                    }
                }
            }
            Message::ThemeSelected(name) => {
                self.theme_override = if name == INSTITUTE_THEME { None } else { theme_from_str(name) };
                save_theme_override(&self.session.store, self.theme_override.as_ref());
                Task::none()
            }

            Message::LoginEmailChanged(value) => {
                self.login_email = value;
                Task::none()
            }
            Message::LoginPasswordChanged(value) => {
                self.login_password = value;
                Task::none()
            }
            Message::LoginAsUserToggled(value) => {
                self.login_as_user = value;
                Task::none()
            }
            Message::LoginPressed => {
                if self.login_in_flight {
                    return Task::none();
                }
                if self.login_email.trim().is_empty() || self.login_password.is_empty() {
                    self.login_error = Some("Please enter your email and password.".to_string());
                    return Task::none();
                }
                if let Err(err) = validate_email(&self.login_email) {
                    self.login_error = Some(err.user_message());
                    return Task::none();
                }
                self.login_error = None;
                self.login_in_flight = true;
                let credentials = Credentials {
                    email: self.login_email.trim().to_string(),
                    password: self.login_password.clone(),
                };
                let api = self.session.api.clone();
                if self.login_as_user {
                    Task::perform(async move { api.user_login(&credentials).await }, Message::LoggedIn)
                } else {
                    Task::perform(async move { api.staff_login(&credentials).await }, Message::LoggedIn)
                }
            }
            Message::LoggedIn(result) => {
                self.login_in_flight = false;
                match result {
                    Ok(response) => {
                        let role = self.session.begin(&response);
                        self.role = Some(role.clone());
                        self.alert = None;
                        self.login_error = None;
                        self.login_password.clear();
                        self.attendance_user_type = UserType::Student;
                        // The pre-login fetch ran without a token.
                        let config = self.session.config.clone();
                        let refresh =
                            Task::perform(async move { config.refresh().await }, Message::ConfigRefreshed);
                        Task::batch([refresh, self.open(home_screen(&role))])
                    }
                    Err(ApiError::AuthExpired) => {
                        self.login_error = Some("Invalid email or password.".to_string());
                        Task::none()
                    }
                    Err(err) => {
                        self.login_error = Some(err.user_message());
                        Task::none()
                    }
                }
            }

            Message::ActivateEmailChanged(value) => {
                self.activate_email = value;
                Task::none()
            }
            Message::ActivateTokenChanged(value) => {
                self.activate_token = value;
                Task::none()
            }
            Message::ActivatePasswordChanged(value) => {
                self.activate_password = value;
                Task::none()
            }
            Message::ActivateConfirmChanged(value) => {
                self.activate_confirm = value;
                Task::none()
            }
            Message::ActivatePressed => {
                self.activate_message = None;
                match self.activation_request() {
                    Ok(request) => {
                        self.activate_error = None;
                        let api = self.session.api.clone();
                        Task::perform(async move { api.activate_student(&request).await }, Message::Activated)
                    }
                    Err(err) => {
                        self.activate_error = Some(err.user_message());
                        Task::none()
                    }
                }
            }
            Message::Activated(result) => {
                match result {
                    Ok(message) => {
                        info!(email = %self.activate_email, "account activated");
                        self.activate_message = Some(message);
                        self.activate_password.clear();
                        self.activate_confirm.clear();
                        self.activate_token.clear();
                    }
                    Err(ApiError::AuthExpired) => {
                        self.activate_error = Some("The activation link is invalid or has expired.".to_string());
                    }
                    Err(err) => self.activate_error = Some(err.user_message()),
                }
                Task::none()
            }

            Message::CoursesLoaded(result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                match result {
                    Ok(courses) => self.courses = courses,
                    Err(err) => warn!(%err, "course list unavailable"),
                }
                Task::none()
            }
            Message::CascadeCourseSelected(target, course) => {
                self.clear_dependent_choice(target);
                let request = self
                    .cascade_mut(target)
                    .and_then(|cascade| cascade.select_course(course.map(|c| c.id)));
                match request {
                    Some(request) => self.batch_task(target, request),
                    None => Task::none(),
                }
            }
            Message::CascadeBatchSelected(target, batch) => {
                self.clear_dependent_choice(target);
                let Some(cascade) = self.cascade_mut(target) else {
                    return Task::none();
                };
                match cascade.select_batch(batch.id) {
                    Ok(request) => self.dependent_tasks(target, request),
                    Err(err) => {
                        debug!(%err, "batch selection rejected");
                        Task::none()
                    }
                }
            }
            Message::CascadeBatchesLoaded(target, generation, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                let replayed = self
                    .cascade_mut(target)
                    .and_then(|cascade| cascade.batches_loaded_with_replay(generation, result));
                match replayed {
                    Some(request) => self.dependent_tasks(target, request),
                    None => Task::none(),
                }
            }
            Message::CascadeFeesLoaded(target, generation, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                if let Some(cascade) = self.cascade_mut(target) {
                    cascade.fees_loaded(generation, result);
                }
                Task::none()
            }
            Message::CascadeSubjectsLoaded(target, generation, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                if let Some(cascade) = self.cascade_mut(target) {
                    cascade.subjects_loaded(generation, result);
                }
                Task::none()
            }

            Message::StudentsLoaded(result) => {
                if self.expired(&result) || self.current_screen != Screen::Students {
                    return Task::none();
                }
                self.students_loading = false;
                match result {
                    Ok(students) => {
                        let session = self.session.clone();
                        let currency = self.branding.formatters.currency_symbol.clone();
                        let requests = self.students.load(students, student_plan, |slot, key| {
                            cached_cell(&session, &currency, slot, key)
                        });
                        debug!(outstanding = requests.len(), "student rows built");
                        Task::batch(requests.into_iter().map(|request| enrich_task(session.clone(), request)))
                    }
                    Err(err) => {
                        self.students_error = Some(err.user_message());
                        Task::none()
                    }
                }
            }
            Message::CellEnriched { generation, row_id, slot, result } => {
                if self.expired(&result) {
                    return Task::none();
                }
                self.students.apply(generation, &row_id, slot, result);
                Task::none()
            }
            Message::DeleteStudent(id) => {
                let api = self.session.api.clone();
                let target = id.clone();
                Task::perform(async move { api.delete_student(&target).await }, move |result| {
                    Message::StudentDeleted(id.clone(), result)
                })
            }
            Message::StudentDeleted(id, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                match result {
                    Ok(()) => {
                        info!(student = %id, "student deleted");
                        self.students.remove(&id);
                    }
                    Err(err) => self.students_error = Some(err.user_message()),
                }
                Task::none()
            }

            Message::EditStudent(id) => {
                self.student_form = Some(StudentForm::new(id.clone()));
                self.current_screen = Screen::StudentForm;
                let api = self.session.api.clone();
                let target = id.clone();
                let load = Task::perform(async move { api.get_student(&target).await }, move |result| {
                    Message::StudentLoaded(id.clone(), result)
                });
                Task::batch([self.load_courses(), load])
            }
            Message::StudentLoaded(id, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                let Some(form) = self.student_form.as_mut().filter(|f| f.student_id == id) else {
                    return Task::none();
                };
                let request = match result {
                    Ok(student) => {
                        form.fill(&student);
                        student
                            .course_id
                            .clone()
                            .and_then(|course| form.cascade.replay(course, student.batch_id.clone()))
                    }
                    Err(err) => {
                        form.error = Some(err.user_message());
                        None
                    }
                };
                match request {
                    Some(request) => self.batch_task(CascadeTarget::StudentForm, request),
                    None => Task::none(),
                }
            }
            Message::FormFirstNameChanged(value) => self.edit_form(|form| form.first_name = value),
            Message::FormLastNameChanged(value) => self.edit_form(|form| form.last_name = value),
            Message::FormEmailChanged(value) => self.edit_form(|form| form.email = value),
            Message::FormPhoneChanged(value) => self.edit_form(|form| form.phone = value),
            Message::FormPasswordChanged(value) => self.edit_form(|form| form.password = value),
            Message::FormConfirmPasswordChanged(value) => {
                self.edit_form(|form| form.confirm_password = value)
            }
            Message::FormFeeStructureSelected(fee) => {
                self.edit_form(|form| form.fee_structure = Some(fee.id))
            }
            Message::SaveStudent => {
                let Some(form) = self.student_form.as_mut() else {
                    return Task::none();
                };
                if form.saving || !form.cascade.is_interactive() {
                    return Task::none();
                }
                match form.to_update() {
                    Ok(update) => {
                        form.error = None;
                        form.saving = true;
                        let api = self.session.api.clone();
                        let id = form.student_id.clone();
                        Task::perform(async move { api.update_student(&id, &update).await }, Message::StudentSaved)
                    }
                    Err(err) => {
                        form.error = Some(err.user_message());
                        Task::none()
                    }
                }
            }
            Message::StudentSaved(result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                match result {
                    Ok(()) => {
                        if let Some(form) = self.student_form.take() {
                            info!(student = %form.student_id, "student updated");
                        }
                        self.open(Screen::Students)
                    }
                    Err(err) => self.edit_form(|form| {
                        form.saving = false;
                        form.error = Some(err.user_message());
                    }),
                }
            }
            Message::CancelEdit => {
                self.student_form = None;
                self.open(Screen::Students)
            }

            Message::MyFeeLoaded(result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                self.my_fee = match result {
                    Ok(Some(fee)) => DependentView::Ready((*fee).clone()),
                    Ok(None) | Err(ApiError::NotFound) => DependentView::Empty,
                    Err(err) => DependentView::Failed(err.user_message()),
                };
                Task::none()
            }

            Message::AttendanceUserTypeSelected(user_type) => {
                self.attendance_user_type = user_type;
                self.load_attendance()
            }
            Message::PreviousMonth => {
                self.attendance_month = self.attendance_month.previous();
                self.load_attendance()
            }
            Message::NextMonth => {
                self.attendance_month = self.attendance_month.next();
                self.load_attendance()
            }
            Message::ChooseMonth => {
                self.show_month_picker = true;
                Task::none()
            }
            Message::CancelMonth => {
                self.show_month_picker = false;
                Task::none()
            }
            Message::SubmitMonth(date) => {
                self.attendance_date = date;
                self.attendance_month = ReportMonth { year: date.year, month: date.month };
                self.show_month_picker = false;
                self.load_attendance()
            }
            Message::AttendanceLoaded(month, user_type, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                if month != self.attendance_month || user_type != self.attendance_user_type {
                    debug!(?month, %user_type, "discarding attendance for a previous selection");
                    return Task::none();
                }
                self.attendance = match result {
                    Ok(rows) if rows.is_empty() => DependentView::Empty,
                    Ok(rows) => DependentView::Ready(rows),
                    Err(ApiError::NotFound) => DependentView::Empty,
                    Err(err) => DependentView::Failed(err.user_message()),
                };
                Task::none()
            }
            Message::ExportAttendance => {
                let DependentView::Ready(rows) = &self.attendance else {
                    return Task::none();
                };
                let rows = rows.clone();
                let user_type = self.attendance_user_type;
                let month = self.attendance_month;
                let dir = self.session.reports_dir();
                self.attendance_notice = None;
                Task::perform(
                    async move {
                        spawn_blocking(move || {
                            write_attendance_excel(&rows, user_type, month, &dir).map_err(|e| e.to_string())
                        })
                        .await
                        .map_err(|e| e.to_string())
                        .and_then(|result| result)
                    },
                    Message::AttendanceExported,
                )
            }
            Message::AttendanceExported(result) => {
                self.attendance_notice = Some(match result {
                    Ok(path) => {
                        info!(path = %path.display(), "attendance report written");
                        format!("Report saved to {}", path.display())
                    }
                    Err(err) => {
                        error!(%err, "attendance export failed");
                        format!("Export failed: {}", err)
                    }
                });
                Task::none()
            }

            Message::FeedbackLoaded(result) => {
                if self.expired(&result) || self.current_screen != Screen::Feedback {
                    return Task::none();
                }
                match result {
                    Ok(items) => {
                        self.feedback_responses = items
                            .iter()
                            .filter_map(|f| f.admin_response.clone().map(|r| (f.id.clone(), r)))
                            .collect();
                        self.feedback = items;
                        self.feedback_error = None;
                    }
                    Err(err) => self.feedback_error = Some(err.user_message()),
                }
                Task::none()
            }
            Message::FeedbackFilterSelected(filter) => {
                self.feedback_filter = filter;
                Task::none()
            }
            Message::FeedbackResponseChanged(id, value) => {
                self.feedback_responses.insert(id, value);
                Task::none()
            }
            Message::SetFeedbackStatus(id, status) => {
                let admin_response = self
                    .feedback_responses
                    .get(&id)
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty());
                let update = FeedbackUpdate { status, admin_response: admin_response.clone() };
                let api = self.session.api.clone();
                let target = id.clone();
                Task::perform(async move { api.update_feedback(&target, &update).await }, move |result| {
                    Message::FeedbackUpdated(id.clone(), status, admin_response.clone(), result)
                })
            }
            Message::FeedbackUpdated(id, status, admin_response, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                match result {
                    Ok(()) => {
                        if let Some(item) = self.feedback.iter_mut().find(|f| f.id == id) {
                            item.status = status;
                            if admin_response.is_some() {
                                item.admin_response = admin_response;
                            }
                        }
                        self.feedback_error = None;
                    }
                    Err(err) => self.feedback_error = Some(err.user_message()),
                }
                Task::none()
            }
            Message::DeleteFeedback(id) => {
                let api = self.session.api.clone();
                let target = id.clone();
                Task::perform(async move { api.delete_feedback(&target).await }, move |result| {
                    Message::FeedbackDeleted(id.clone(), result)
                })
            }
            Message::FeedbackDeleted(id, result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                match result {
                    Ok(()) => {
                        self.feedback.retain(|f| f.id != id);
                        self.feedback_responses.remove(&id);
                    }
                    Err(err) => self.feedback_error = Some(err.user_message()),
                }
                Task::none()
            }

            Message::SchedulesLoaded(result) => {
                if self.expired(&result) || self.current_screen != Screen::MarkEntry {
                    return Task::none();
                }
                match result {
                    Ok(schedules) => self.schedules = schedules,
                    Err(err) => self.marks_notice = Some(err.user_message()),
                }
                Task::none()
            }
            Message::MarkSubjectSelected(subject) => {
                self.marks_subject = subject.map(|s| s.id);
                Task::none()
            }
            Message::ScheduleSelected(schedule) => {
                self.selected_schedule = Some(schedule.id.clone());
                self.mark_sheet = DependentView::Loading;
                self.marks_notice = None;
                let api = self.session.api.clone();
                let id = schedule.id.clone();
                Task::perform(async move { api.enrollments(&id).await }, move |result| {
                    Message::EnrollmentsLoaded(schedule.clone(), result)
                })
            }
            Message::EnrollmentsLoaded(schedule, result) => {
                if self.expired(&result) || self.selected_schedule.as_ref() != Some(&schedule.id) {
                    return Task::none();
                }
                self.mark_sheet = match result {
                    Ok(enrollments) if enrollments.is_empty() => DependentView::Empty,
                    Ok(enrollments) => DependentView::Ready(MarkSheet::new(schedule, enrollments)),
                    Err(ApiError::NotFound) => DependentView::Empty,
                    Err(err) => DependentView::Failed(err.user_message()),
                };
                Task::none()
            }
            Message::MarkChanged(index, value) => {
                if let DependentView::Ready(sheet) = &mut self.mark_sheet {
                    sheet.set_input(index, value);
                }
                Task::none()
            }
            Message::AbsentToggled(index, absent) => {
                if let DependentView::Ready(sheet) = &mut self.mark_sheet {
                    sheet.set_absent(index, absent);
                }
                Task::none()
            }
            Message::RemarksChanged(index, value) => {
                if let DependentView::Ready(sheet) = &mut self.mark_sheet {
                    sheet.set_remarks(index, value);
                }
                Task::none()
            }
            Message::SaveMarks => {
                let DependentView::Ready(sheet) = &self.mark_sheet else {
                    return Task::none();
                };
                if self.marks_saving {
                    return Task::none();
                }
                match sheet.to_payload() {
                    Ok(payload) => {
                        let api = self.session.api.clone();
                        let id = sheet.schedule.id.clone();
                        self.marks_saving = true;
                        self.marks_notice = None;
                        Task::perform(async move { api.bulk_save_marks(&id, &payload).await }, Message::MarksSaved)
                    }
                    Err(err) => {
                        self.marks_notice = Some(err.to_string());
                        Task::none()
                    }
                }
            }
            Message::MarksSaved(result) => {
                if self.expired(&result) {
                    return Task::none();
                }
                self.marks_saving = false;
                self.marks_notice = Some(match result {
                    Ok(()) => "Marks saved.".to_string(),
                    Err(err) => {
                        error!(%err, "saving marks failed");
                        err.user_message()
                    }
                });
                Task::none()
            }
        }
    }

    /// Sets the screen and starts whatever it needs to show.
    pub fn open(&mut self, screen: Screen) -> Task<Message> {
        self.current_screen = screen;
        match screen {
            Screen::Students => {
                self.students_loading = true;
                self.students_error = None;
                let api = self.session.api.clone();
                Task::perform(async move { api.list_students().await }, Message::StudentsLoaded)
            }
            Screen::Fees if self.is_student() => self.load_my_fee(),
            Screen::Fees => {
                self.fees_cascade = Cascade::default();
                self.load_courses()
            }
            Screen::Attendance => self.load_attendance(),
            Screen::Feedback => {
                self.feedback_error = None;
                let api = self.session.api.clone();
                Task::perform(async move { api.all_feedback().await }, Message::FeedbackLoaded)
            }
            Screen::MarkEntry => {
                self.marks_cascade = Cascade::default();
                self.marks_subject = None;
                self.selected_schedule = None;
                self.mark_sheet = DependentView::Idle;
                self.marks_notice = None;
                let api = self.session.api.clone();
                let schedules =
                    Task::perform(async move { api.my_assigned_schedules().await }, Message::SchedulesLoaded);
                Task::batch([self.load_courses(), schedules])
            }
            Screen::Login | Screen::Activate | Screen::StudentForm | Screen::Settings => Task::none(),
        }
    }

    /// True when the result ended the session; the caller must stop processing it.
    fn expired<T>(&mut self, result: &Result<T, ApiError>) -> bool {
        match result {
            Err(err) if err.is_auth() => {
                self.expire_session();
                true
            }
            _ => false,
        }
    }

    fn expire_session(&mut self) {
        if self.role.is_none() && self.current_screen == Screen::Login {
            return;
        }
        info!("session rejected by the server, returning to login");
        self.session.end();
        self.reset_user_state();
        self.alert = Some(SESSION_EXPIRED.to_string());
        self.current_screen = Screen::Login;
    }

    /// A new course or batch invalidates whatever was picked from its dependents.
    fn clear_dependent_choice(&mut self, target: CascadeTarget) {
        match target {
            CascadeTarget::StudentForm => {
                if let Some(form) = &mut self.student_form {
                    form.fee_structure = None;
                }
            }
            CascadeTarget::MarkEntry => self.marks_subject = None,
            CascadeTarget::Fees => {}
        }
    }

    fn edit_form(&mut self, edit: impl FnOnce(&mut StudentForm)) -> Task<Message> {
        if let Some(form) = &mut self.student_form {
            edit(form);
        }
        Task::none()
    }

    fn apply_config(&mut self, config: Arc<SessionConfig>) -> Task<Message> {
        self.branding = Branding::from_config(&config);
        let logo_url = config.logo_url.clone().filter(|url| !url.trim().is_empty());
        self.config = Some(config);
        match logo_url {
            Some(url) => {
                let api = self.session.api.clone();
                Task::perform(async move { api.fetch_bytes(&url).await }, Message::LogoLoaded)
            }
            None => {
                self.logo = None;
                Task::none()
            }
        }
    }

    fn activation_request(&self) -> Result<ActivationRequest, ApiError> {
        validate_email(&self.activate_email)?;
        if !is_valid_uuid(&self.activate_token) {
            return Err(ApiError::Validation("The activation token is not valid.".into()));
        }
        let password = password_change(&self.activate_password, &self.activate_confirm)?
            .ok_or_else(|| ApiError::Validation("Please choose a password.".into()))?;
        Ok(ActivationRequest {
            email: self.activate_email.trim().to_string(),
            activation_token: self.activate_token.trim().to_string(),
            password,
        })
    }

    fn load_courses(&self) -> Task<Message> {
        if !self.courses.is_empty() {
            return Task::none();
        }
        let api = self.session.api.clone();
        Task::perform(async move { api.courses().await }, Message::CoursesLoaded)
    }

    fn load_my_fee(&mut self) -> Task<Message> {
        let Some(student_id) = self.session.student_id() else {
            self.my_fee = DependentView::Failed("No student record is linked to this account.".to_string());
            return Task::none();
        };
        self.my_fee = DependentView::Loading;
        let session = self.session.clone();
        Task::perform(
            async move {
                let student = session.api.get_student(&student_id).await?;
                match student.fee_structure_id {
                    Some(id) => session.fee_structure(id).await.map(Some),
                    None => Ok(None),
                }
            },
            Message::MyFeeLoaded,
        )
    }

    fn load_attendance(&mut self) -> Task<Message> {
        if self.is_student() {
            self.attendance_user_type = UserType::Student;
        }
        let month = self.attendance_month;
        let user_type = self.attendance_user_type;
        let query = MonthlyAttendanceQuery {
            user_type,
            year: month.year,
            month: month.month,
            user_id: if self.is_student() { self.session.student_id() } else { None },
        };
        self.attendance = DependentView::Loading;
        self.attendance_notice = None;
        let api = self.session.api.clone();
        Task::perform(async move { api.monthly_attendance(&query).await }, move |result| {
            Message::AttendanceLoaded(month, user_type, result)
        })
    }

    fn batch_task(&self, target: CascadeTarget, request: BatchRequest) -> Task<Message> {
        let BatchRequest { course_id, generation } = request;
        let api = self.session.api.clone();
        Task::perform(async move { api.batches(&course_id).await }, move |result| {
            Message::CascadeBatchesLoaded(target, generation, result)
        })
    }

    /// Fee structures and subjects for a course/batch pair. Mark entry uses the
    /// subjects to narrow its exam list and never shows fees.
    fn dependent_tasks(&self, target: CascadeTarget, request: DependentRequest) -> Task<Message> {
        let DependentRequest { course_id, batch_id, generation } = request;
        let session = self.session.clone();
        let subjects_course = course_id.clone();
        let subjects = Task::perform(
            async move { session.course_subjects(subjects_course).await.map(|s| s.to_vec()) },
            move |result| Message::CascadeSubjectsLoaded(target, generation, result),
        );
        if target == CascadeTarget::MarkEntry {
            return subjects;
        }
        let api = self.session.api.clone();
        let fees = Task::perform(
            async move { api.find_fee_structures(&course_id, &batch_id).await },
            move |result| Message::CascadeFeesLoaded(target, generation, result),
        );
        Task::batch([fees, subjects])
    }
}

fn home_screen(role: &Role) -> Screen {
    match role {
        Role::Student => Screen::Fees,
        Role::Teacher => Screen::MarkEntry,
        Role::Admin | Role::Staff(_) => Screen::Students,
    }
}

fn cached_cell(session: &Session, currency: &str, slot: Slot, key: &Id) -> Option<String> {
    match slot {
        Slot::Subjects => session.cached_subjects(key).map(|subjects| subjects_text(&subjects)),
        Slot::FeeSummary => session.cached_fee_structure(key).map(|fee| fee_summary(&fee, currency)),
    }
}

/// One lookup for one cell. Fee summaries wait for the configuration so the
/// currency symbol is the institute's.
fn enrich_task(session: Session, request: EnrichRequest) -> Task<Message> {
    let EnrichRequest { generation, row_id, slot, key } = request;
    Task::perform(
        async move {
            match slot {
                Slot::Subjects => session.course_subjects(key).await.map(|subjects| subjects_text(&subjects)),
                Slot::FeeSummary => {
                    let config = session.config.wait_ready().await;
                    session
                        .fee_structure(key)
                        .await
                        .map(|fee| fee_summary(&fee, &config.currency_symbol))
                }
            }
        },
        move |result| Message::CellEnriched {
            generation,
            row_id: row_id.clone(),
            slot,
            result,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::models::{Batch, Course, LoginResponse, LoginUser, Schedule, Student, Subject};
    use crate::storage::{LocalStore, TOKEN_KEY};

    fn signed_in_app() -> App {
        let session = Session::new("http://erp.test", Arc::new(LocalStore::in_memory()), PathBuf::from("target"));
        session.begin(&LoginResponse {
            token: "tok".into(),
            user: Some(LoginUser { id: Some(Id::from("1")), name: None, role: "admin".into(), student_id: None }),
            role: None,
            active_session_id: None,
            active_branch_id: None,
        });
        let mut app = App::with_session(session);
        app.current_screen = Screen::Students;
        app
    }

    fn student(id: &str) -> Student {
        Student {
            id: Id::from(id),
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.com".into(),
            phone: None,
            course_id: Some(Id::from("c1")),
            batch_id: Some(Id::from("b1")),
            fee_structure_id: None,
            course_name: None,
            batch_name: None,
            status: None,
        }
    }

    #[test]
    fn rejected_token_returns_to_login_without_touching_the_list() {
        let mut app = signed_in_app();
        let _ = app.update(Message::StudentsLoaded(Err(ApiError::AuthExpired)));

        assert_eq!(app.current_screen, Screen::Login);
        assert_eq!(app.alert.as_deref(), Some(SESSION_EXPIRED));
        assert!(app.session.store.get(TOKEN_KEY).is_none());
        assert!(app.role.is_none());
        assert!(app.students.is_empty());
    }

    #[test]
    fn refused_config_refresh_keeps_the_user_signed_in() {
        let mut app = signed_in_app();
        let _ = app.update(Message::ConfigRefreshed(Err(ApiError::AuthExpired)));

        assert_eq!(app.current_screen, Screen::Students);
        assert_eq!(app.alert, None);
        assert!(app.role.is_some());
        assert_eq!(app.session.store.get(TOKEN_KEY).as_deref(), Some("tok"));
    }

    #[test]
    fn default_config_after_login_keeps_the_user_signed_in() {
        let mut app = signed_in_app();
        let _ = app.update(Message::ConfigRefreshed(Ok(Arc::new(SessionConfig::default()))));

        assert_eq!(app.current_screen, Screen::Students);
        assert!(app.role.is_some());
        assert_eq!(app.title(), SessionConfig::default().institute_name);
    }

    #[test]
    fn bad_credentials_are_not_a_session_expiry() {
        let session = Session::new("http://erp.test", Arc::new(LocalStore::in_memory()), PathBuf::from("target"));
        let mut app = App::with_session(session);
        let _ = app.update(Message::LoggedIn(Err(ApiError::AuthExpired)));

        assert_eq!(app.current_screen, Screen::Login);
        assert_eq!(app.alert, None);
        assert_eq!(app.login_error.as_deref(), Some("Invalid email or password."));
    }

    #[test]
    fn password_mismatch_stops_the_save() {
        let mut app = signed_in_app();
        let mut form = StudentForm::new(Id::from("7"));
        form.fill(&student("7"));
        form.password = "Secret123".into();
        form.confirm_password = "Different1".into();
        app.student_form = Some(form);

        let _ = app.update(Message::SaveStudent);

        let form = app.student_form.as_ref().unwrap();
        assert!(!form.saving);
        assert_eq!(form.error.as_deref(), Some("Passwords do not match."));
    }

    #[test]
    fn stale_batches_for_the_edit_form_are_ignored() {
        let mut app = signed_in_app();
        app.student_form = Some(StudentForm::new(Id::from("7")));
        let course = |id: &str| Course { id: Id::from(id), name: id.into(), code: None, duration_months: None };

        let _ = app.update(Message::CascadeCourseSelected(CascadeTarget::StudentForm, Some(course("c1"))));
        let _ = app.update(Message::CascadeCourseSelected(CascadeTarget::StudentForm, Some(course("c2"))));
        let first = vec![Batch { id: Id::from("b1"), name: "Morning".into(), start_date: None }];
        let _ = app.update(Message::CascadeBatchesLoaded(CascadeTarget::StudentForm, 1, Ok(first)));

        let form = app.student_form.as_ref().unwrap();
        assert_eq!(form.cascade.course(), Some(&Id::from("c2")));
        assert!(form.cascade.batch_options().batches().is_empty());
    }

    #[test]
    fn enrichment_cells_arrive_independently() {
        let mut app = signed_in_app();
        let mut with_fee = student("1");
        with_fee.fee_structure_id = Some(Id::from("f1"));
        let _ = app.update(Message::StudentsLoaded(Ok(vec![with_fee, student("2")])));
        let generation = app.students.generation();

        let _ = app.update(Message::CellEnriched {
            generation,
            row_id: Id::from("2"),
            slot: Slot::Subjects,
            result: Ok("Maths".into()),
        });

        let rows = app.students.rows();
        assert_eq!(rows[1].cell(Slot::Subjects).text(), "Maths");
        assert_eq!(rows[0].cell(Slot::Subjects).text(), crate::enrich::LOADING);
        assert_eq!(rows[0].cell(Slot::FeeSummary).text(), crate::enrich::LOADING);
        assert_eq!(rows[1].cell(Slot::FeeSummary).text(), "-");
    }

    #[test]
    fn mark_entry_exams_are_narrowed_by_subject() {
        let mut app = signed_in_app();
        let _ = app.update(Message::GoTo(Screen::MarkEntry));
        let schedule = |id: &str, subject: &str| Schedule {
            id: Id::from(id),
            exam_name: "Midterm".into(),
            subject_id: Some(Id::from(subject)),
            subject_name: subject.into(),
            course_id: Some(Id::from("c1")),
            batch_id: Some(Id::from("b1")),
            course_name: None,
            batch_name: None,
            max_marks: Some(100.0),
            pass_marks: None,
            exam_date: None,
        };
        let _ = app.update(Message::SchedulesLoaded(Ok(vec![schedule("s1", "maths"), schedule("s2", "art")])));
        assert_eq!(app.visible_schedules().len(), 2);

        let maths = Subject { id: Id::from("maths"), name: "Maths".into(), code: None };
        let _ = app.update(Message::MarkSubjectSelected(Some(maths)));
        let visible = app.visible_schedules();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, Id::from("s1"));

        let course = Course { id: Id::from("c1"), name: "c1".into(), code: None, duration_months: None };
        let _ = app.update(Message::CascadeCourseSelected(CascadeTarget::MarkEntry, Some(course)));
        assert_eq!(app.marks_subject, None);
        assert_eq!(app.visible_schedules().len(), 2);
    }

    #[test]
    fn institute_theme_choice_clears_override() {
        let mut app = signed_in_app();
        let _ = app.update(Message::ThemeSelected("Dark"));
        assert_eq!(app.theme(), iced::Theme::Dark);
        let _ = app.update(Message::ThemeSelected(INSTITUTE_THEME));
        assert!(app.theme_override.is_none());
    }
}
