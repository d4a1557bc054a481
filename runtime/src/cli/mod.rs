//! CLI subcommand implementations for the `harvest` binary.

pub mod doctor;
pub mod output;
pub mod providers_cmd;
pub mod run_cmd;
pub mod show_cmd;
