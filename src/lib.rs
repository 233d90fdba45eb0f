pub mod api;
pub mod app;
pub mod cli;
pub mod logging;
pub mod realm;
pub mod settings;
pub mod theme;
pub mod types;
pub mod ui;
