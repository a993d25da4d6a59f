pub mod actions;
pub mod check;
pub mod common;
pub mod config;
pub mod delete;
pub mod list;
pub mod log;
pub mod sync;
