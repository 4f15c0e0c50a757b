//! Countdown timer CLI library.
//!
//! This crate provides the `ct` command-line interface over the timer core.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
