use iced::{widget::{button, checkbox, column, text, text_input, vertical_space, Container}, Center, Length};
use crate::app::state::Screen;
use crate::app::{App, Message};
use crate::screens::error_text;

pub fn login_screen(app: &App) -> Container<Message> {
    let mut content = column![
        text(&app.branding.title).size(30),
        text("Sign in").size(20),
        vertical_space(),
    ]
    .spacing(15)
    .width(Length::Fill)
    .align_x(Center);

    if let Some(alert) = &app.alert {
        content = content.push(error_text(alert).size(18));
    }

    content = content
        .push(
            text_input("Email", &app.login_email)
                .on_input(Message::LoginEmailChanged)
                .padding(10)
                .size(18)
                .width(Length::Fixed(350.0)),
        )
        .push(
            text_input("Password", &app.login_password)
                .on_input(Message::LoginPasswordChanged)
                .on_submit(Message::LoginPressed)
                .secure(true)
                .padding(10)
                .size(18)
                .width(Length::Fixed(350.0)),
        )
        .push(
            checkbox("Student / teacher account", app.login_as_user)
                .on_toggle(Message::LoginAsUserToggled),
        )
        .push(
            button(if app.login_in_flight { "Signing in…" } else { "Sign in" })
                .on_press_maybe((!app.login_in_flight).then_some(Message::LoginPressed))
                .padding(10),
        );

    if let Some(error) = &app.login_error {
        content = content.push(error_text(error).size(18));
    }

    content = content.push(vertical_space()).push(
        button("Activate a student account")
            .on_press(Message::GoTo(Screen::Activate))
            .padding(10),
    );

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(40)
}
