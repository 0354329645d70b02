use iced::{Element, Length};
use iced::widget::{Column, Container, Row};
use crate::app::state::Screen;
use crate::screens::{
    activate_screen, attendance_screen, feedback_screen, fees_screen, login_screen,
    mark_entry_screen, nav_menu, settings_screen, student_form_screen, students_screen,
};
use super::{App, Message};

impl App {
    pub fn view(&self) -> Element<Message> {
        let signed_out = matches!(self.current_screen, Screen::Login | Screen::Activate);
        Row::new()
            .spacing(20)
            .push(
                // Sidebar
                if !signed_out {
                    Container::new(nav_menu(self))
                        .width(Length::Fixed(220.0))
                        .height(Length::Fill)
                        .padding(10)
                } else {
                    Container::new(Column::new())
                        .width(Length::Fixed(0.0))
                        .height(Length::Fill)
                }
            )
            .push(
                match &self.current_screen {
                    Screen::Login => login_screen(self),
                    Screen::Activate => activate_screen(self),
                    Screen::Students => students_screen(self),
                    Screen::StudentForm => student_form_screen(self),
                    Screen::Fees => fees_screen(self),
                    Screen::Attendance => attendance_screen(self),
                    Screen::Feedback => feedback_screen(self),
                    Screen::MarkEntry => mark_entry_screen(self),
                    Screen::Settings => settings_screen(self),
                }
                    .width(Length::Fill),
            )
            .into()
    }
}
