//! # Configuration management
//!
//! The board server obtains run-time configuration from the following sources,
//! highest priority first:
//! 1. Command-line options
//! 2. Environment variables prefixed `THREADBOARD_` (e.g. `THREADBOARD_CHUNK_SIZE=4096`)
//! 3. A file named with `--config`
//! 4. The user's configuration file, `threadboard/threadboard.toml` under the platform config directory
//! 5. The system-wide configuration file `/etc/threadboard.toml`
//! 6. Hard-wired defaults
//!
//! Run `threadboard config-files` for the list of files we read,
//! and `threadboard show-config` to see the merged result and where each value came from.
//!
//! ## File format
//!
//! Configuration files are TOML, one key per [Configuration] field:
//!
//! ```text
//! data_dir = "/srv/board"
//! transfer_ports = "20000-20100"   # or 0 to let the OS choose
//! transfer_timeout = 60            # seconds; 0 waits forever
//! time_format = "utc"
//! ```

mod structure;
pub use structure::{Configuration, ConfigurationOverrides, MINIMUM_DATAGRAM};

mod sysdefault;
use sysdefault::SystemDefault;

mod manager;
pub use manager::Manager;

mod prettyprint;
pub use prettyprint::DisplayAdapter;

pub(crate) const BASE_CONFIG_FILENAME: &str = "threadboard";
pub(crate) const ENV_PREFIX: &str = "THREADBOARD_";
