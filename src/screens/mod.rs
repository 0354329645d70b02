pub mod activate;
pub mod attendance;
pub mod feedback;
pub mod fees;
pub mod login;
pub mod mark_entry;
pub mod nav_menu;
pub mod settings;
pub mod student_form;
pub mod students;

pub use activate::activate_screen;
pub use attendance::attendance_screen;
pub use feedback::feedback_screen;
pub use fees::fees_screen;
pub use login::login_screen;
pub use mark_entry::mark_entry_screen;
pub use nav_menu::nav_menu;
pub use settings::settings_screen;
pub use student_form::student_form_screen;
pub use students::students_screen;

use iced::widget::{button, pick_list, text, Row, Text};
use iced::{Alignment, Color};
use crate::app::state::CascadeTarget;
use crate::app::Message;
use crate::cascade::{Cascade, DependentView};
use crate::models::{Batch, Course};

pub(crate) fn error_text<'a>(message: &str) -> Text<'a> {
    text(message.to_string()).color(Color::from_rgb(0.8, 0.1, 0.1))
}

/// One line describing a dependent view that has nothing to render yet.
pub(crate) fn status_line<'a, T>(view: &DependentView<T>, empty: &str) -> Option<Text<'a>> {
    match view {
        DependentView::Idle | DependentView::Ready(_) => None,
        DependentView::Loading => Some(text("Loading…")),
        DependentView::Empty => Some(text(empty.to_string())),
        DependentView::Failed(message) => Some(error_text(message)),
    }
}

/// Course and batch selectors. Until a course is chosen, or while an edit
/// replay is still running, the batch list is empty and shows why.
pub(crate) fn cascade_selectors<'a>(
    courses: &'a [Course],
    cascade: &'a Cascade,
    target: CascadeTarget,
) -> Row<'a, Message> {
    let interactive = cascade.is_interactive();
    let course_options: &'a [Course] = if interactive { courses } else { &[] };
    let selected_course = cascade.course().and_then(|id| courses.iter().find(|c| &c.id == id));
    let course_pick = pick_list(course_options, selected_course, move |course: Course| {
        Message::CascadeCourseSelected(target, Some(course))
    })
    .placeholder("Select course");

    let options = cascade.batch_options();
    let batch_options: &'a [Batch] = if interactive { options.batches() } else { &[] };
    let batch_pick = pick_list(batch_options, cascade.selected_batch(), move |batch: Batch| {
        Message::CascadeBatchSelected(target, batch)
    })
    .placeholder(options.placeholder());

    Row::new()
        .spacing(10)
        .align_y(Alignment::Center)
        .push(text("Course:"))
        .push(course_pick)
        .push(
            button("Clear").on_press_maybe(
                cascade
                    .course()
                    .filter(|_| interactive)
                    .map(|_| Message::CascadeCourseSelected(target, None)),
            ),
        )
        .push(text("Batch:"))
        .push(batch_pick)
}
