pub mod app;
pub mod commands;
pub mod env;
pub mod rules;
pub mod runtime;
pub mod serve;
