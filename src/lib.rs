pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod exit;
pub mod inventory;
pub mod rules;
pub mod ui;
