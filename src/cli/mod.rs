pub mod config;
pub mod list;
pub mod report;
pub mod setup;
pub mod show;
pub mod ui;
pub mod watch;
