pub mod app;
pub mod commands;
pub mod config;
pub mod env;
pub mod run;
pub mod runtime;
pub mod selectors;

pub use app::run;
