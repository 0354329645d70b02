use iced::widget::container::bordered_box;
use iced::widget::{horizontal_space, text, Column, Container, Row, Scrollable};
use iced::Length;
use crate::app::state::CascadeTarget;
use crate::app::{App, Message};
use crate::cascade::DependentView;
use crate::config::Formatters;
use crate::fees::breakdown;
use crate::models::FeeStructure;
use crate::screens::{cascade_selectors, status_line};
use crate::session::subjects_text;

pub fn fees_screen(app: &App) -> Container<Message> {
    let content = if app.is_student() {
        my_fee(app)
    } else {
        fee_lookup(app)
    };

    Container::new(Scrollable::new(content.padding(20)).height(Length::Fill))
        .width(Length::Fill)
        .height(Length::Fill)
}

fn my_fee(app: &App) -> Column<Message> {
    let mut content = Column::new().spacing(15).push(text("My fees").size(30));
    match &app.my_fee {
        DependentView::Ready(fee) => {
            content = content.push(fee_card(fee, &app.branding.formatters));
        }
        other => {
            if let Some(line) = status_line(other, "No fee structure is assigned to you yet.") {
                content = content.push(line);
            }
        }
    }
    content
}

fn fee_lookup(app: &App) -> Column<Message> {
    let cascade = &app.fees_cascade;
    let mut content = Column::new()
        .spacing(15)
        .push(text("Fee structures").size(30))
        .push(cascade_selectors(&app.courses, cascade, CascadeTarget::Fees));

    if let DependentView::Ready(subjects) = cascade.subjects() {
        content = content.push(text(format!("Subjects: {}", subjects_text(subjects))));
    }

    match cascade.fees() {
        DependentView::Ready(fees) => {
            for fee in fees {
                content = content.push(fee_card(fee, &app.branding.formatters));
            }
        }
        DependentView::Idle if cascade.course().is_some() => {
            content = content.push(text("Select a batch to see its fee structures."));
        }
        other => {
            if let Some(line) = status_line(other, "No fee structures for this course and batch.") {
                content = content.push(line);
            }
        }
    }
    content
}

fn fee_card<'a>(fee: &FeeStructure, formatters: &Formatters) -> Container<'a, Message> {
    let detail = breakdown(fee);
    let mut lines = Column::new().spacing(5).push(text(fee.to_string()).size(20));
    for line in detail.lines {
        lines = lines.push(
            Row::new()
                .push(text(line.label))
                .push(horizontal_space())
                .push(text(formatters.money(line.amount))),
        );
    }
    lines = lines.push(
        Row::new()
            .push(text("Total").size(18))
            .push(horizontal_space())
            .push(text(formatters.money(detail.total)).size(18)),
    );
    Container::new(lines)
        .padding(10)
        .width(Length::Fill)
        .style(bordered_box)
}
