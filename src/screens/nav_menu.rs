use iced::{widget::{button, Column}, Alignment, Element, Length, Renderer, Theme};
use iced::widget::{image, text, vertical_space, Container, Row};
use iced_font_awesome::fa_icon_solid;
use crate::app::state::Screen;
use crate::app::{App, Message};
use crate::session::Role;

pub(crate) fn icon_button_content<'a>(
    icon_element: impl Into<Element<'a, Message, Theme, Renderer>>,
    label: &'a str,
) -> Row<'a, Message> {
    Row::new()
        .align_y(Alignment::Center)
        .spacing(5)
        .push(icon_element)
        .push(text(label))
}

/// Menu entries per role: icon, label, target screen and the feature switch that hides it.
fn entries(role: &Role) -> &'static [(&'static str, &'static str, Screen, Option<&'static str>)] {
    match role {
        Role::Student => &[
            ("file-invoice-dollar", "My fees", Screen::Fees, Some("fees")),
            ("calendar-check", "Attendance", Screen::Attendance, Some("attendance")),
        ],
        Role::Teacher => &[
            ("pen-to-square", "Mark entry", Screen::MarkEntry, Some("mark_entry")),
            ("calendar-check", "Attendance", Screen::Attendance, Some("attendance")),
        ],
        Role::Admin | Role::Staff(_) => &[
            ("user-graduate", "Students", Screen::Students, None),
            ("file-invoice-dollar", "Fees", Screen::Fees, Some("fees")),
            ("calendar-check", "Attendance", Screen::Attendance, Some("attendance")),
            ("comments", "Feedback", Screen::Feedback, Some("feedback")),
            ("pen-to-square", "Mark entry", Screen::MarkEntry, Some("mark_entry")),
        ],
    }
}

fn nav_button<'a>(icon: &'a str, label: &'a str, theme: &Theme, message: Message) -> Element<'a, Message> {
    let theme = theme.clone();
    button(icon_button_content(
        fa_icon_solid(icon).style(move |_| text::base(&theme)),
        label,
    ))
    .on_press(message)
    .width(Length::Fill)
    .into()
}

pub fn nav_menu(app: &App) -> Container<Message> {
    let theme = app.theme();
    let mut content = Column::new().spacing(10);

    if let Some(logo) = &app.logo {
        content = content.push(image(logo.clone()).width(Length::Fixed(120.0)));
    }
    content = content.push(text(&app.branding.title).size(18).color(app.branding.secondary));
    if let Some(role) = &app.role {
        content = content.push(text(format!("Signed in as {}", role)).size(14));
        for &(icon, label, screen, feature) in entries(role) {
            let enabled = feature
                .map(|name| app.config.as_ref().is_none_or(|c| c.feature_enabled(name)))
                .unwrap_or(true);
            if enabled {
                content = content.push(nav_button(icon, label, &theme, Message::GoTo(screen)));
            }
        }
    }

    content = content
        .push(vertical_space())
        .push(nav_button("gear", "Settings", &theme, Message::GoTo(Screen::Settings)))
        .push(nav_button("arrow-right-from-bracket", "Log out", &theme, Message::Logout));

    if let Some(watermark) = &app.branding.watermark {
        content = content.push(text(watermark).size(12).color(app.branding.secondary));
    }

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(10)
}
