use iced::widget::container::bordered_box;
use iced::widget::{button, horizontal_space, pick_list, text, Column, Container, Row, Scrollable};
use iced::{Alignment, Length, Theme};
use iced_aw::date_picker;
use iced_font_awesome::fa_icon_solid;
use crate::app::{App, Message};
use crate::attendance::{attendance_percentage, totals};
use crate::cascade::DependentView;
use crate::models::UserType;
use crate::screens::nav_menu::icon_button_content;
use crate::screens::status_line;
use crate::session::Role;

const COLUMNS: [&str; 7] = ["Name", "Present", "Absent", "Late", "Leave", "Days", "Attendance"];

pub fn attendance_screen(app: &App) -> Container<Message> {
    let theme = app.theme();
    let month_button = button(icon_button_content(
        fa_icon_solid("calendar").style(move |_| iced::widget::text::base(&theme)),
        "Pick month",
    ))
    .on_press(Message::ChooseMonth);

    let month_picker = date_picker(
        app.show_month_picker,
        app.attendance_date,
        month_button,
        Message::CancelMonth,
        Message::SubmitMonth,
    );

    let mut controls = Row::new()
        .spacing(10)
        .align_y(Alignment::Center)
        .push(button("<").on_press(Message::PreviousMonth))
        .push(text(app.attendance_month.label()).size(20))
        .push(button(">").on_press(Message::NextMonth))
        .push(month_picker);

    if app.role.as_ref().is_some_and(Role::is_staff) {
        controls = controls.push(text("Show:")).push(pick_list(
            UserType::ALL,
            Some(app.attendance_user_type),
            Message::AttendanceUserTypeSelected,
        ));
    }
    controls = controls.push(horizontal_space()).push(
        button("Export to Excel").on_press_maybe(
            matches!(app.attendance, DependentView::Ready(_)).then_some(Message::ExportAttendance),
        ),
    );

    let mut content = Column::new()
        .spacing(15)
        .padding(20)
        .push(text("Monthly attendance").size(30))
        .push(controls);

    if let Some(notice) = &app.attendance_notice {
        content = content.push(text(notice));
    }

    match &app.attendance {
        DependentView::Ready(rows) => {
            let mut table = Column::new().spacing(6).push(table_row(COLUMNS.map(String::from), 16));
            for row in rows {
                let percentage = attendance_percentage(row)
                    .map(|p| format!("{:.1}%", p))
                    .unwrap_or_else(|| "-".to_string());
                table = table.push(table_row(
                    [
                        row.name.clone(),
                        row.present.to_string(),
                        row.absent.to_string(),
                        row.late.to_string(),
                        row.leave.to_string(),
                        row.total_days.to_string(),
                        percentage,
                    ],
                    14,
                ));
            }
            let summary = totals(rows);
            let average = summary
                .average_percentage
                .map(|p| format!("{:.1}%", p))
                .unwrap_or_else(|| "-".to_string());
            content = content
                .push(
                    Container::new(Scrollable::new(table).height(Length::Fill))
                        .padding(10)
                        .style(bordered_box),
                )
                .push(text(format!(
                    "{} people, {} present, {} absent, {} late, {} on leave, average {}",
                    summary.users, summary.present, summary.absent, summary.late, summary.leave, average
                )));
        }
        other => {
            if let Some(line) = status_line(other, "No attendance recorded for this month.") {
                content = content.push(line);
            }
        }
    }

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
}

fn table_row<'a>(cells: [String; 7], size: u16) -> Row<'a, Message, Theme> {
    cells.into_iter().enumerate().fold(Row::new().spacing(10), |row, (i, cell)| {
        let width = if i == 0 { Length::FillPortion(3) } else { Length::FillPortion(1) };
        row.push(text(cell).size(size).width(width))
    })
}
