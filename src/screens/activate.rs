use iced::{widget::{button, column, text, text_input, vertical_space, Container, TextInput}, Center, Length};
use crate::app::state::Screen;
use crate::app::{App, Message};
use crate::screens::error_text;

pub fn activate_screen(app: &App) -> Container<Message> {
    let mut content = column![
        text("Activate account").size(30),
        text("Use the email and token from your activation link."),
        vertical_space(),
        field("Email", &app.activate_email).on_input(Message::ActivateEmailChanged),
        field("Activation token", &app.activate_token).on_input(Message::ActivateTokenChanged),
        field("New password", &app.activate_password)
            .on_input(Message::ActivatePasswordChanged)
            .secure(true),
        field("Confirm password", &app.activate_confirm)
            .on_input(Message::ActivateConfirmChanged)
            .on_submit(Message::ActivatePressed)
            .secure(true),
        button("Activate").on_press(Message::ActivatePressed).padding(10),
    ]
    .spacing(15)
    .width(Length::Fill)
    .align_x(Center);

    if let Some(error) = &app.activate_error {
        content = content.push(error_text(error));
    }
    if let Some(message) = &app.activate_message {
        content = content.push(text(message).size(18));
    }

    content = content
        .push(vertical_space())
        .push(button("Back to sign in").on_press(Message::GoTo(Screen::Login)).padding(10));

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(40)
}

fn field<'a>(placeholder: &str, value: &str) -> TextInput<'a, Message> {
    text_input(placeholder, value)
        .padding(10)
        .size(18)
        .width(Length::Fixed(350.0))
}
