//! Command Line Interface for threadboard
mod args;
mod cli_main;
pub mod styles;
pub use cli_main::cli;
