//! Configuration structure

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use figment::{providers::Serialized, Metadata, Provider};
use human_repr::{HumanCount as _, HumanDuration as _};
use serde::{Deserialize, Serialize};

use crate::{
    cli::styles::{INFO, RESET},
    store::check_title,
    util::{PortRange, TimeFormat},
};

/// Smallest control-channel receive buffer we accept.
/// Anything smaller risks truncating ordinary commands.
pub const MINIMUM_DATAGRAM: usize = 512;

/// The set of configurable options for the board server.
///
/// There is no `default()`. The hard-wired defaults are available through
/// [`Configuration::system_default()`]; everything else comes via the [`Manager`](super::Manager).
///
/// In configuration files and environment variables, field names are `snake_case`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    /// IP address for the control socket and for transfer listeners
    pub bind_address: IpAddr,
    /// Directory holding thread records, attachments and staging files
    pub data_dir: PathBuf,
    /// Credential store. A relative path is resolved against `data_dir`.
    pub credentials_file: PathBuf,
    /// Port pool for transfer listeners. `0` lets the OS choose.
    pub transfer_ports: PortRange,
    /// How many ports to try before giving up on a transfer
    pub port_attempts: u16,
    /// Seconds to wait for the peer to connect to a transfer port and complete the transfer.
    /// `0` waits forever.
    pub transfer_timeout: u16,
    /// Seconds to wait for each reply during the login handshake. `0` waits forever.
    pub login_timeout: u16,
    /// Stream-channel buffer size, in bytes
    pub chunk_size: usize,
    /// Control-channel receive buffer size, in bytes
    pub max_datagram: usize,
    /// Time stamp format for log lines
    pub time_format: TimeFormat,
}

impl Configuration {
    /// Every field name, in declaration order
    pub const FIELDS: &'static [&'static str] = &[
        "bind_address",
        "data_dir",
        "credentials_file",
        "transfer_ports",
        "port_attempts",
        "transfer_timeout",
        "login_timeout",
        "chunk_size",
        "max_datagram",
        "time_format",
    ];
}

static SYSTEM_DEFAULT_CONFIG: LazyLock<Configuration> = LazyLock::new(|| Configuration {
    bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
    data_dir: PathBuf::from("."),
    credentials_file: PathBuf::from("credentials.txt"),
    transfer_ports: PortRange::default(),
    port_attempts: 10,
    transfer_timeout: 30,
    login_timeout: 30,
    chunk_size: 2048,
    max_datagram: 2048,
    time_format: TimeFormat::Local,
});

fn optional_secs(secs: u16) -> Option<Duration> {
    match secs {
        0 => None,
        s => Some(Duration::from_secs(s.into())),
    }
}

impl Configuration {
    /// Returns the system default settings
    #[must_use]
    pub fn system_default() -> &'static Self {
        &SYSTEM_DEFAULT_CONFIG
    }

    /// Where the credential store lives
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        if self.credentials_file.is_absolute() {
            self.credentials_file.clone()
        } else {
            self.data_dir.join(&self.credentials_file)
        }
    }

    /// Transfer timeout, or `None` to wait forever
    #[must_use]
    pub fn transfer_timeout_duration(&self) -> Option<Duration> {
        optional_secs(self.transfer_timeout)
    }

    /// Per-reply handshake timeout, or `None` to wait forever
    #[must_use]
    pub fn login_timeout_duration(&self) -> Option<Duration> {
        optional_secs(self.login_timeout)
    }

    /// One-line summary of the server settings, for the startup log
    #[must_use]
    pub fn format_server_config(&self) -> String {
        let timeout = self
            .transfer_timeout_duration()
            .map_or_else(|| "none".to_string(), |d| d.human_duration().to_string());
        let ports = if self.transfer_ports.is_any() {
            "any".to_string()
        } else {
            self.transfer_ports.to_string()
        };
        format!(
            "data in {dir}, transfer ports {ports} ({attempts} attempts), chunk {chunk}, transfer timeout {timeout}",
            dir = self.data_dir.display(),
            attempts = self.port_attempts,
            chunk = self.chunk_size.human_count_bytes(),
        )
    }

    /// Performs additional validation checks on a configuration object
    pub fn try_validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("The transfer chunk size ({INFO}chunk_size 0{RESET}) must be at least 1");
        }
        if self.max_datagram < MINIMUM_DATAGRAM {
            anyhow::bail!(
                "The datagram buffer ({INFO}max_datagram {val}{RESET}) is too small; it must be at least {MINIMUM_DATAGRAM}",
                val = self.max_datagram,
            );
        }
        if self.port_attempts == 0 {
            anyhow::bail!("At least one transfer port attempt is required ({INFO}port_attempts 0{RESET})");
        }
        if self.credentials_file.as_os_str().is_empty() {
            anyhow::bail!("The credentials file path ({INFO}credentials_file{RESET}) must not be empty");
        }
        if self.credentials_in_thread_namespace() {
            anyhow::bail!(
                "The credentials file ({INFO}credentials_file {file}{RESET}) would be taken for a thread; give it a name containing a dot, or keep it outside the data directory",
                file = self.credentials_file.display(),
            );
        }
        Ok(())
    }

    /// Does the credential store sit directly in the data directory under a name that is a valid thread title?
    fn credentials_in_thread_namespace(&self) -> bool {
        fn lexical(p: &Path) -> PathBuf {
            p.components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect()
        }
        let path = self.credentials_path();
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return false;
        };
        lexical(parent) == lexical(&self.data_dir)
            && name.to_str().is_some_and(|n| check_title(n).is_ok())
    }

    /// Performs additional validation checks, passing the configuration through on success
    pub fn validate(self) -> Result<Self> {
        self.try_validate()?;
        Ok(self)
    }
}

/// Command-line overrides for [`Configuration`].
///
/// Every field is optional; fields the user does not give fall through to
/// lower-priority sources (environment, config files, system defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Args, Serialize)]
pub struct ConfigurationOverrides {
    /// IP address to bind the control socket and transfer listeners to [default: 127.0.0.1]
    #[arg(long, value_name("ADDR"), help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<IpAddr>,

    /// Directory holding thread records and attachments [default: .]
    #[arg(long, value_name("DIR"), help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Credential store; relative paths are resolved against the data directory
    /// [default: credentials.txt]
    #[arg(long, value_name("FILE"), help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// TCP port or range for transfer listeners, e.g. `20000-20100`; `0` lets the OS choose
    /// [default: 20000-30000]
    #[arg(short = 'p', long, value_name("M-N"), help_heading("Transfers"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_ports: Option<PortRange>,

    /// Bind attempts before reporting that no port is available [default: 10]
    #[arg(long, value_name("N"), help_heading("Transfers"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_attempts: Option<u16>,

    /// Seconds to wait for a transfer to connect and complete; 0 waits forever [default: 30]
    #[arg(long, value_name("sec"), help_heading("Transfers"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_timeout: Option<u16>,

    /// Seconds to wait for each login handshake reply; 0 waits forever [default: 30]
    #[arg(long, value_name("sec"), help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_timeout: Option<u16>,

    /// Stream buffer size in bytes [default: 2048]
    #[arg(long, value_name("bytes"), help_heading("Transfers"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,

    /// Control-channel receive buffer size in bytes [default: 2048]
    #[arg(long, value_name("bytes"), help_heading("Configuration"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_datagram: Option<usize>,

    /// Time format for log lines [default: local]
    #[arg(short = 'T', long, value_name("FORMAT"), help_heading("Output"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,
}

impl Provider for ConfigurationOverrides {
    fn metadata(&self) -> Metadata {
        Metadata::named("command line")
    }

    fn data(
        &self,
    ) -> std::result::Result<
        figment::value::Map<figment::Profile, figment::value::Dict>,
        figment::Error,
    > {
        Serialized::defaults(self).data()
    }
}
