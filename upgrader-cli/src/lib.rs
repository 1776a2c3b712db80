//! Library half of the `upgrader` binary: config discovery and prompts.

pub mod config;
pub mod prompt;
