use iced::widget::container::bordered_box;
use iced::widget::{button, column, pick_list, row, text, text_input, Column, Container, Scrollable};
use iced::{Alignment, Length};
use crate::app::state::CascadeTarget;
use crate::app::{App, Message};
use crate::cascade::DependentView;
use crate::fees::calculate_total_fee;
use crate::models::FeeStructure;
use crate::screens::{cascade_selectors, error_text, status_line};
use crate::session::subjects_text;

pub fn student_form_screen(app: &App) -> Container<Message> {
    let Some(form) = &app.student_form else {
        return Container::new(text("No student selected.")).padding(40);
    };
    if !form.loaded && form.error.is_none() {
        return Container::new(text("Loading student…")).padding(40);
    }

    let mut content = Column::new()
        .spacing(15)
        .padding(20)
        .push(text(format!("Edit student #{}", form.student_id)).size(30))
        .push(row![
            text_input("First name", &form.first_name).on_input(Message::FormFirstNameChanged).padding(8),
            text_input("Last name", &form.last_name).on_input(Message::FormLastNameChanged).padding(8),
        ].spacing(10))
        .push(row![
            text_input("Email", &form.email).on_input(Message::FormEmailChanged).padding(8),
            text_input("Phone", &form.phone).on_input(Message::FormPhoneChanged).padding(8),
        ].spacing(10))
        .push(cascade_selectors(&app.courses, &form.cascade, CascadeTarget::StudentForm));

    let formatters = &app.branding.formatters;
    match form.cascade.fees() {
        DependentView::Ready(fees) => {
            let selected = form
                .fee_structure
                .as_ref()
                .and_then(|id| fees.iter().find(|f| &f.id == id));
            let total = selected.map(|fee| formatters.money(calculate_total_fee(fee)));
            content = content.push(
                row![
                    text("Fee structure:"),
                    pick_list(fees.as_slice(), selected, |fee: FeeStructure| {
                        Message::FormFeeStructureSelected(fee)
                    })
                    .placeholder("Select fee structure"),
                    text(total.map(|t| format!("Total: {}", t)).unwrap_or_default()),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            );
        }
        other => {
            if let Some(line) = status_line(other, "No fee structures for this batch.") {
                content = content.push(line);
            }
        }
    }

    match form.cascade.subjects() {
        DependentView::Ready(subjects) => {
            content = content.push(text(format!("Subjects: {}", subjects_text(subjects))));
        }
        other => {
            if let Some(line) = status_line(other, "No subjects for this course.") {
                content = content.push(line);
            }
        }
    }

    content = content.push(
        Container::new(column![
            text("Change password (leave empty to keep the current one)"),
            row![
                text_input("New password", &form.password)
                    .on_input(Message::FormPasswordChanged)
                    .secure(true)
                    .padding(8),
                text_input("Confirm password", &form.confirm_password)
                    .on_input(Message::FormConfirmPasswordChanged)
                    .secure(true)
                    .padding(8),
            ]
            .spacing(10),
        ].spacing(8))
        .padding(10)
        .style(bordered_box),
    );

    if let Some(error) = &form.error {
        content = content.push(error_text(error));
    }

    let can_save = !form.saving && form.cascade.is_interactive();
    content = content.push(
        row![
            button(if form.saving { "Saving…" } else { "Save" })
                .on_press_maybe(can_save.then_some(Message::SaveStudent)),
            button("Cancel").on_press(Message::CancelEdit),
        ]
        .spacing(10),
    );

    Container::new(Scrollable::new(content).height(Length::Fill))
        .width(Length::Fill)
        .height(Length::Fill)
}
