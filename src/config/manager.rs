//! Configuration file wrangling

use super::{Configuration, SystemDefault, BASE_CONFIG_FILENAME, ENV_PREFIX};

use anyhow::{Context as _, Result};
use figment::{
    providers::{Env, Format as _, Toml},
    Figment, Provider,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Processes and merges all possible configuration sources.
///
/// To see which files apply on the current system, run `threadboard config-files`.
#[derive(Debug, Clone)]
pub struct Manager {
    /// Configuration data
    pub(super) data: Figment,
}

impl Manager {
    fn new(apply_config_files: bool, apply_env: bool) -> Self {
        let mut new1 = Self {
            data: Figment::new(),
        };
        if apply_config_files {
            for path in Self::config_paths() {
                new1.add_config(&path);
            }
        }
        if apply_env {
            new1.merge_provider(Env::prefixed(ENV_PREFIX));
        }
        new1
    }

    /// General constructor for production use
    ///
    /// Reads the system and user configuration files, then an optional explicit file,
    /// then the environment. An explicit file that does not exist is an error.
    /// The system defaults are *not* applied; see [`Manager::apply_system_default`].
    pub fn standard(explicit: Option<&Path>) -> Result<Self> {
        let mut new1 = Self::new(true, false);
        if let Some(path) = explicit {
            anyhow::ensure!(
                path.is_file(),
                "configuration file {} not found",
                path.display()
            );
            new1.merge_toml_file(path);
        }
        new1.merge_provider(Env::prefixed(ENV_PREFIX));
        Ok(new1)
    }

    /// Reads no files and no environment; applies the system defaults.
    #[must_use]
    pub fn without_files() -> Self {
        let mut new1 = Self::new(false, false);
        new1.apply_system_default();
        new1
    }

    /// Holds no data at all
    #[must_use]
    pub fn empty() -> Self {
        Self::new(false, false)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc").join(format!("{BASE_CONFIG_FILENAME}.toml"))];
        if let Some(dir) = dirs::config_dir() {
            paths.push(
                dir.join(BASE_CONFIG_FILENAME)
                    .join(format!("{BASE_CONFIG_FILENAME}.toml")),
            );
        }
        paths
    }

    fn add_config(&mut self, path: &Path) {
        if !path.exists() {
            debug!("configuration file {path:?} not present");
            return;
        }
        self.merge_toml_file(path);
    }

    /// Returns the list of configuration files we read, lowest priority first
    #[must_use]
    pub fn config_files() -> Vec<String> {
        Self::config_paths()
            .iter()
            .map(|p| p.as_os_str().to_string_lossy().to_string())
            .collect()
    }

    /// Merges in a data set, which is some sort of [figment::Provider](https://docs.rs/figment/latest/figment/trait.Provider.html).
    /// This uses figment's `merge` operation, which prefers to _replace_ existing items.
    pub fn merge_provider<T>(&mut self, provider: T)
    where
        T: Provider,
    {
        let f = std::mem::take(&mut self.data);
        self.data = f.merge(provider);
    }

    /// Merges in a TOML configuration file
    pub fn merge_toml_file<P: AsRef<Path>>(&mut self, path: P) {
        self.merge_provider(Toml::file(path.as_ref()));
    }

    /// Applies the system default settings, at a lower priority than everything else
    pub fn apply_system_default(&mut self) {
        let f = std::mem::take(&mut self.data);
        self.data = f.join(SystemDefault {});
    }

    /// Attempts to extract a particular struct from the data.
    ///
    /// `T` is usually [Configuration], but it isn't required to be.
    pub fn get<'de, T>(&self) -> Result<T, figment::Error>
    where
        T: Deserialize<'de>,
    {
        self.data.extract_lossy::<T>()
    }

    /// Extracts and validates the [Configuration]
    pub fn configuration(&self) -> Result<Configuration> {
        self.get::<Configuration>()
            .context("invalid configuration")?
            .validate()
    }
}

#[cfg(test)]
mod test {
    use crate::config::{Configuration, ConfigurationOverrides, Manager};
    use crate::util::{PortRange, TimeFormat};
    use pretty_assertions::assert_eq;
    use rusty_fork::rusty_fork_test;
    use serde::Deserialize;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn write_conf(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults() {
        let mgr = Manager::without_files();
        let result: Configuration = mgr.get().unwrap();
        assert_eq!(*Configuration::system_default(), result);
    }

    #[test]
    fn cli_merge() {
        let entered = ConfigurationOverrides {
            chunk_size: Some(4096),
            ..Default::default()
        };
        let expected = Configuration {
            chunk_size: 4096,
            ..Configuration::system_default().clone()
        };
        let mut mgr = Manager::without_files();
        mgr.merge_provider(entered);
        assert_eq!(expected, mgr.get::<Configuration>().unwrap());
    }

    #[test]
    fn toml_file() {
        let f = write_conf(
            r#"
            data_dir = "/srv/board"
            transfer_ports = "21000-21010"
            transfer_timeout = 0
            time_format = "UTC"
        "#,
        );
        let mut mgr = Manager::without_files();
        mgr.merge_toml_file(f.path());
        let cfg = mgr.configuration().unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/board"));
        assert_eq!(
            cfg.transfer_ports,
            PortRange {
                begin: 21000,
                end: 21010
            }
        );
        assert!(cfg.transfer_timeout_duration().is_none());
        assert_eq!(cfg.time_format, TimeFormat::Utc);
        assert_eq!(cfg.chunk_size, 2048);
    }

    #[test]
    fn cli_beats_config_file() {
        let f = write_conf("chunk_size = 99\nport_attempts = 3\n");
        let mut mgr = Manager::empty();
        mgr.merge_toml_file(f.path());
        mgr.merge_provider(ConfigurationOverrides {
            chunk_size: Some(12345),
            ..Default::default()
        });
        mgr.apply_system_default();
        let cfg = mgr.configuration().unwrap();
        assert_eq!(cfg.chunk_size, 12345);
        assert_eq!(cfg.port_attempts, 3);
    }

    #[test]
    fn field_parse_failure() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Test {
            p: PortRange,
        }
        let f = write_conf("p = \"234-123\"\n");
        let mut mgr = Manager::empty();
        mgr.merge_toml_file(f.path());
        let err = mgr.get::<Test>().unwrap_err();
        assert!(err.to_string().contains("must be increasing"), "{err}");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let f = write_conf("max_datagram = 16\n");
        let mut mgr = Manager::without_files();
        mgr.merge_toml_file(f.path());
        let err = mgr.configuration().unwrap_err();
        assert!(err.to_string().contains("max_datagram 16"), "{err}");
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let _ = Manager::standard(Some(&missing)).unwrap_err();
    }

    #[test]
    fn config_files_listed() {
        let files = Manager::config_files();
        assert!(files[0].ends_with("threadboard.toml"));
    }

    // environment is process-global
    rusty_fork_test! {
        #[test]
        fn environment_beats_file() {
            let f = write_conf("login_timeout = 7\nchunk_size = 10\n");
            std::env::set_var("THREADBOARD_CHUNK_SIZE", "777");
            let mut mgr = Manager::standard(Some(f.path())).unwrap();
            mgr.apply_system_default();
            let cfg = mgr.configuration().unwrap();
            assert_eq!(cfg.chunk_size, 777);
            assert_eq!(cfg.login_timeout, 7);
        }
    }
}
