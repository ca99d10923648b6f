pub mod app;
pub mod braille;
pub mod bubble;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod map;
pub mod tooltip;
pub mod ui;
