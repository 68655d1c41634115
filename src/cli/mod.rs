//! CLI command handlers
//!
//! Each subcommand of the studentdesk binary is implemented in its own module.

pub mod ask;
pub mod config;
pub mod export;
pub mod helpers;
pub mod serve;
