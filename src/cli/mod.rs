pub mod convert;
pub mod quota;
pub mod setup;
pub mod show;
pub mod ui;
