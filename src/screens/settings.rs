use iced::{widget::{column, text, Container, vertical_space}, Length, Center, Theme};
use iced::widget::{button, pick_list, Column};
use crate::app::{App, Message};
use crate::config::theme_to_str;

/// Pick-list entry that follows the institute's configured colours.
pub const INSTITUTE_THEME: &str = "Institute";

pub fn settings_screen(app: &App) -> Container<Message> {
    let current_name = app.theme_override.as_ref().map(theme_to_str).unwrap_or(INSTITUTE_THEME);
    let mut theme_names: Vec<&'static str> = vec![INSTITUTE_THEME];
    theme_names.extend(Theme::ALL.iter().map(theme_to_str));

    let mut content = column![
        text("Settings").size(30),
        vertical_space(),
        pick_list(theme_names, Some(current_name), Message::ThemeSelected)
            .placeholder("Choose a theme"),
        button("Reload institute configuration").on_press(Message::RefreshConfig),
    ]
        .spacing(15)
        .align_x(Center);

    if let Some(message) = &app.settings_message {
        content = content.push(text(message));
    }

    if let Some(config) = &app.config {
        let mut details = Column::new()
            .spacing(5)
            .push(text(format!("Institute: {}", config.institute_name)))
            .push(text(format!("Currency: {}", config.currency_symbol)))
            .push(text(format!("Date format: {}", config.date_format)));
        let disabled: Vec<&str> = config
            .features
            .iter()
            .filter(|(_, on)| !**on)
            .map(|(name, _)| name.as_str())
            .collect();
        if !disabled.is_empty() {
            details = details.push(text(format!("Disabled features: {}", disabled.join(", "))));
        }
        content = content.push(details);
    }

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(40)
}
