use iced::widget::container::bordered_box;
use iced::widget::{button, horizontal_space, pick_list, text, text_input, Column, Container, Row, Scrollable};
use iced::{Alignment, Length};
use crate::app::{App, Message};
use crate::models::FeedbackStatus;
use crate::screens::error_text;

const ALL_STATUSES: &str = "All";

pub fn feedback_screen(app: &App) -> Container<Message> {
    let mut filter_options = vec![ALL_STATUSES.to_string()];
    filter_options.extend(FeedbackStatus::ALL.iter().map(ToString::to_string));
    let current = app
        .feedback_filter
        .map(|s| s.to_string())
        .unwrap_or_else(|| ALL_STATUSES.to_string());

    let filter_row = Row::new()
        .spacing(10)
        .align_y(Alignment::Center)
        .push(text("Status:"))
        .push(pick_list(filter_options, Some(current), |selection: String| {
            Message::FeedbackFilterSelected(
                FeedbackStatus::ALL.iter().copied().find(|s| s.to_string() == selection),
            )
        }));

    let mut content = Column::new()
        .spacing(15)
        .padding(20)
        .push(text("Feedback").size(30))
        .push(filter_row);

    if let Some(error) = &app.feedback_error {
        content = content.push(error_text(error));
    }

    let formatters = &app.branding.formatters;
    let mut list = Column::new().spacing(10);
    let mut shown = 0;
    for item in app.visible_feedback() {
        shown += 1;
        let heading = format!(
            "{} · {}",
            item.submitted_by.as_deref().unwrap_or("Anonymous"),
            item.subject.as_deref().unwrap_or("No subject"),
        );
        let mut meta = format!("Status: {}", item.status);
        if let Some(rating) = item.rating {
            meta.push_str(&format!(" · Rating: {}/5", rating));
        }
        if let Some(created) = &item.created_at {
            meta.push_str(&format!(" · {}", formatters.date(created)));
        }
        let response = app.feedback_responses.get(&item.id).map(String::as_str).unwrap_or("");
        let id = item.id.clone();

        let actions = Row::new()
            .spacing(10)
            .align_y(Alignment::Center)
            .push(
                text_input("Response to the submitter", response)
                    .on_input(move |value| Message::FeedbackResponseChanged(id.clone(), value))
                    .padding(6),
            )
            .push(
                button("Approve").on_press_maybe(
                    (item.status != FeedbackStatus::Approved)
                        .then(|| Message::SetFeedbackStatus(item.id.clone(), FeedbackStatus::Approved)),
                ),
            )
            .push(
                button("Reject").on_press_maybe(
                    (item.status != FeedbackStatus::Rejected)
                        .then(|| Message::SetFeedbackStatus(item.id.clone(), FeedbackStatus::Rejected)),
                ),
            )
            .push(button("Delete").on_press(Message::DeleteFeedback(item.id.clone())));

        let card = Column::new()
            .spacing(6)
            .push(
                Row::new()
                    .push(text(heading).size(18))
                    .push(horizontal_space())
                    .push(text(meta).size(14)),
            )
            .push(text(&item.message))
            .push(actions);

        list = list.push(Container::new(card).padding(10).width(Length::Fill).style(bordered_box));
    }
    if shown == 0 {
        list = list.push(text("No feedback to show."));
    }

    content = content.push(Scrollable::new(list).height(Length::Fill));

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
}
