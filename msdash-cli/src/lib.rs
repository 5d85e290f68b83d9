pub mod app;
pub mod backends;
pub mod commands;
pub mod logging;
pub mod ui;
