//! Command line arguments

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::styles::CLAP_STYLES;
use crate::config::ConfigurationOverrides;

/// Threaded bulletin board over UDP, with TCP side channels for attachments
#[derive(Debug, Parser, Clone)]
#[command(author, version, about, styles = CLAP_STYLES, max_term_width = 100)]
pub(crate) struct CliArgs {
    /// What to do
    #[command(subcommand)]
    pub(crate) mode: MainMode,

    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=threadboard=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, global = true, help_heading("Debug"))]
    pub(crate) debug: bool,

    /// Quiet mode
    ///
    /// Reports only errors, and switches off transfer progress display.
    #[arg(short, long, action, global = true, conflicts_with("debug"), help_heading("Output"))]
    pub(crate) quiet: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(
        short('l'),
        long,
        action,
        global = true,
        value_name("FILE"),
        help_heading("Output")
    )]
    pub(crate) log_file: Option<String>,

    /// Read this configuration file, after the system and user files
    #[arg(long, global = true, value_name("FILE"), help_heading("Configuration"))]
    pub(crate) config: Option<PathBuf>,
}

/// Operating modes
#[derive(Debug, Subcommand, Clone)]
pub(crate) enum MainMode {
    /// Runs the board server
    Server {
        /// UDP port for the control channel
        port: u16,
        #[command(flatten)]
        overrides: ConfigurationOverrides,
    },
    /// Connects to a board server and runs an interactive session
    Client {
        /// Server host name or address
        host: String,
        /// Server control port
        port: u16,
        /// Where downloaded attachments are written
        #[arg(long, value_name("DIR"), default_value = ".")]
        download_dir: PathBuf,
    },
    /// Outputs the server configuration, then exits
    ShowConfig {
        #[command(flatten)]
        overrides: ConfigurationOverrides,
    },
    /// Outputs the paths to configuration file(s), then exits
    ConfigFiles,
}

impl CliArgs {
    /// Parses `args`, which begin with the program name
    pub(crate) fn custom_parse<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }
}
