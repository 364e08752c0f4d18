pub mod dashboard;
pub mod seed;
pub mod setup;
pub mod ui;
pub mod watch;
