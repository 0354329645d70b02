mod api;
mod app;
mod attendance;
mod cascade;
mod config;
mod enrich;
mod error;
mod fees;
mod lookup;
mod marks;
mod models;
mod report;
mod screens;
mod session;
mod storage;
mod validate;

use app::App;
use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("erp_desk=info")))
        .init();

    iced::application(App::title, App::update, App::view)
        .theme(App::theme)
        .window_size(iced::Size::new(1400.0, 800.0))
        .run_with(App::new)
}
