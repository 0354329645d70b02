use iced::widget::container::bordered_box;
use iced::widget::{button, checkbox, pick_list, text, text_input, Column, Container, Row, Scrollable};
use iced::{Alignment, Length};
use crate::app::state::CascadeTarget;
use crate::app::{App, Message};
use crate::cascade::DependentView;
use crate::models::Subject;
use crate::screens::{cascade_selectors, status_line};

pub fn mark_entry_screen(app: &App) -> Container<Message> {
    let schedules = app.visible_schedules();
    let selected = app
        .selected_schedule
        .as_ref()
        .and_then(|id| schedules.iter().find(|s| &s.id == id))
        .cloned();

    let subjects: &[Subject] = match app.marks_cascade.subjects() {
        DependentView::Ready(subjects) => subjects.as_slice(),
        _ => &[],
    };
    let selected_subject = app
        .marks_subject
        .as_ref()
        .and_then(|id| subjects.iter().find(|s| &s.id == id));

    let mut content = Column::new()
        .spacing(15)
        .padding(20)
        .push(text("Mark entry").size(30))
        .push(cascade_selectors(&app.courses, &app.marks_cascade, CascadeTarget::MarkEntry))
        .push(
            Row::new()
                .spacing(10)
                .align_y(Alignment::Center)
                .push(text("Subject:"))
                .push(
                    pick_list(subjects, selected_subject, |subject: Subject| {
                        Message::MarkSubjectSelected(Some(subject))
                    })
                    .placeholder("All subjects"),
                )
                .push(
                    button("All")
                        .on_press_maybe(app.marks_subject.as_ref().map(|_| Message::MarkSubjectSelected(None))),
                )
                .push(text("Exam:"))
                .push(pick_list(schedules, selected, Message::ScheduleSelected).placeholder("Select exam")),
        );

    if let Some(notice) = &app.marks_notice {
        content = content.push(text(notice));
    }

    match &app.mark_sheet {
        DependentView::Ready(sheet) => {
            let schedule = &sheet.schedule;
            let pass = schedule
                .pass_marks
                .map(|p| format!(", pass {}", p))
                .unwrap_or_default();
            let max = match schedule.max_marks.filter(|max| *max > 0.0) {
                Some(max) => format!("max {}", max),
                None => "no maximum".to_string(),
            };
            content = content.push(text(format!(
                "{} · {}{} · {} below pass",
                schedule.subject_name,
                max,
                pass,
                sheet.failing_count()
            )));

            let mut grid = Column::new().spacing(6);
            for (index, entry) in sheet.entries.iter().enumerate() {
                let label = match &entry.roll_number {
                    Some(roll) => format!("{} ({})", entry.student_name, roll),
                    None => entry.student_name.clone(),
                };
                let mut marks = text_input("Marks", &entry.input).padding(6).width(Length::Fixed(90.0));
                if !entry.absent {
                    marks = marks.on_input(move |value| Message::MarkChanged(index, value));
                }
                grid = grid.push(
                    Row::new()
                        .spacing(10)
                        .align_y(Alignment::Center)
                        .push(text(label).width(Length::FillPortion(3)))
                        .push(marks)
                        .push(checkbox("Absent", entry.absent).on_toggle(move |absent| Message::AbsentToggled(index, absent)))
                        .push(
                            text_input("Remarks", &entry.remarks)
                                .on_input(move |value| Message::RemarksChanged(index, value))
                                .padding(6)
                                .width(Length::FillPortion(2)),
                        ),
                );
            }
            content = content
                .push(Container::new(Scrollable::new(grid).height(Length::Fill)).padding(10).style(bordered_box))
                .push(
                    button(if app.marks_saving { "Saving…" } else { "Save marks" })
                        .on_press_maybe((!app.marks_saving).then_some(Message::SaveMarks)),
                );
        }
        other => {
            if let Some(line) = status_line(other, "No students are enrolled for this exam.") {
                content = content.push(line);
            }
        }
    }

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
}
