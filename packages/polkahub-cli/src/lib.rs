pub mod app;
pub mod args;
pub mod command;
