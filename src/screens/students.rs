use iced::widget::container::bordered_box;
use iced::widget::{button, horizontal_space, text, Column, Container, Row, Scrollable};
use iced::{Alignment, Length};
use crate::app::state::Screen;
use crate::app::{App, Message};
use crate::enrich::Slot;
use crate::screens::error_text;

pub fn students_screen(app: &App) -> Container<Message> {
    let mut main_column = Column::new()
        .spacing(15)
        .padding(20)
        .push(
            Row::new()
                .align_y(Alignment::Center)
                .push(text("Students").size(30))
                .push(horizontal_space())
                .push(button("Reload").on_press(Message::GoTo(Screen::Students))),
        );

    if let Some(error) = &app.students_error {
        main_column = main_column.push(error_text(error));
    }

    let mut list = Column::new().spacing(10);
    if app.students_loading {
        list = list.push(text("Loading students…"));
    } else if app.students.is_empty() && app.students_error.is_none() {
        list = list.push(text("No students found."));
    }

    for row in app.students.rows() {
        let student = &row.record;
        let placement = format!(
            "{} / {}",
            student.course_name.as_deref().unwrap_or("No course"),
            student.batch_name.as_deref().unwrap_or("No batch"),
        );
        let details = Column::new()
            .spacing(5)
            .push(text(student.display_name()).size(20))
            .push(text(&student.email).size(14))
            .push(text(placement).size(14))
            .push(text(format!("Subjects: {}", row.cell(Slot::Subjects).text())).size(14))
            .push(text(format!("Fees: {}", row.cell(Slot::FeeSummary).text())).size(14));

        let card = Row::new()
            .padding(10)
            .spacing(20)
            .align_y(Alignment::Center)
            .push(details)
            .push(horizontal_space())
            .push(button("Edit").on_press(Message::EditStudent(student.id.clone())))
            .push(button("Delete").on_press(Message::DeleteStudent(student.id.clone())));

        list = list.push(Container::new(card).style(bordered_box).width(Length::Fill));
    }

    main_column = main_column.push(
        Scrollable::new(list)
            .width(Length::Fill)
            .height(Length::Fill),
    );

    Container::new(main_column)
        .width(Length::Fill)
        .height(Length::Fill)
}
