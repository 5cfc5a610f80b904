//! Tracing helpers
use std::{
    fs::File,
    io::Write,
    sync::atomic::{AtomicBool, Ordering},
    sync::{Arc, Mutex},
};

use anyhow::Context;
use indicatif::MultiProgress;
use serde::{de, Deserialize, Serialize};
use strum::VariantNames as _;
use tracing_subscriber::{
    fmt::{
        time::{ChronoLocal, ChronoUtc},
        MakeWriter,
    },
    prelude::*,
    EnvFilter,
};

use crate::cli::styles::maybe_strip_color;

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

const FRIENDLY_FORMAT_LOCAL: &str = "%Y-%m-%d %H:%M:%SL";
const FRIENDLY_FORMAT_UTC: &str = "%Y-%m-%d %H:%M:%SZ";

/// Environment variable that controls what gets logged to stderr
const STANDARD_ENV_VAR: &str = "RUST_LOG";
/// Environment variable that controls what gets logged to file
const LOG_FILE_DETAIL_ENV_VAR: &str = "RUST_LOG_FILE_DETAIL";

/// Maps the `--debug` / `--quiet` switches to a trace level. Debug wins if both are given.
#[must_use]
pub fn trace_level(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    }
}

/// Selects the format of time stamps in log lines
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    clap::ValueEnum,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "kebab-case")]
pub enum TimeFormat {
    /// Local time, as "year-month-day HH:MM:SS"
    #[default]
    Local,
    /// UTC time, as "year-month-day HH:MM:SS"
    Utc,
    /// Local time in [RFC 3339](https://datatracker.ietf.org/doc/html/rfc3339) format,
    /// e.g. `2010-03-14T18:32:03+01:00`
    Rfc3339,
}

impl<'de> Deserialize<'de> for TimeFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let lower = s.to_ascii_lowercase();
        std::str::FromStr::from_str(&lower)
            .map_err(|_| de::Error::unknown_variant(&s, TimeFormat::VARIANTS))
    }
}

struct FilterResult {
    filter: EnvFilter,
    /// Did the filter come from the environment?
    used_env: bool,
}

/// Uses the given environment variable if set; otherwise logs only our own events at `trace_level`.
fn filter_for(trace_level: &str, key: &str) -> anyhow::Result<FilterResult> {
    EnvFilter::try_from_env(key)
        .map(|filter| FilterResult {
            filter,
            used_env: true,
        })
        .or_else(|e| {
            if std::env::var(key).is_ok() {
                anyhow::bail!("{key} (set in environment) was not understood: {e}");
            }
            Ok(FilterResult {
                filter: EnvFilter::try_new(format!("threadboard={trace_level}"))?,
                used_env: false,
            })
        })
}

fn make_tracing_layer<S, W, F>(
    writer: W,
    filter: F,
    time_format: TimeFormat,
    show_target: bool,
    ansi: bool,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static + Sync + Send,
    F: tracing_subscriber::layer::Filter<S> + 'static + Sync + Send,
{
    let layer = tracing_subscriber::fmt::layer::<S>()
        .compact()
        .with_target(show_target)
        .with_ansi(ansi);

    // The timer has to go on before the writer and filter
    match time_format {
        TimeFormat::Local => layer
            .with_timer(ChronoLocal::new(FRIENDLY_FORMAT_LOCAL.into()))
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        TimeFormat::Utc => layer
            .with_timer(ChronoUtc::new(FRIENDLY_FORMAT_UTC.into()))
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        TimeFormat::Rfc3339 => layer
            .with_timer(ChronoLocal::rfc_3339())
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

/// Where console log output goes
#[derive(Debug)]
pub enum ConsoleTraceType {
    /// Straight to stderr (the server)
    Standard,
    /// Through an indicatif [`MultiProgress`], so log lines don't tear transfer progress bars (the client)
    Indicatif(MultiProgress),
    /// Nowhere
    None,
}

/// Sets up tracing to the console and optionally to a file.
///
/// By default only our own events are logged, at `trace_level`. `RUST_LOG` overrides this.
///
/// **CAUTION:** If this fails, tracing is not set up; callers must report the error themselves.
///
/// Only the first call in a process has any effect.
pub fn setup(
    trace_level: &str,
    display: ConsoleTraceType,
    log_file: Option<&str>,
    time_format: TimeFormat,
    ansi_colours: bool,
) -> anyhow::Result<()> {
    if is_initialized() {
        tracing::warn!("tracing::setup called a second time (ignoring)");
        return Ok(());
    }
    TRACING_INITIALIZED.store(true, Ordering::Relaxed);

    let layers = setup_inner(trace_level, display, log_file, time_format, ansi_colours)?;
    tracing_subscriber::registry().with(layers).init();
    Ok(())
}

type BoxedLayer = Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>;

fn setup_inner(
    trace_level: &str,
    display: ConsoleTraceType,
    log_file: Option<&str>,
    time_format: TimeFormat,
    ansi_colours: bool,
) -> anyhow::Result<Vec<BoxedLayer>> {
    let mut layers = Vec::new();

    // Show targets only when the user chose the filter; otherwise everything is ours anyway.
    let filter = filter_for(trace_level, STANDARD_ENV_VAR)?;
    match display {
        ConsoleTraceType::None => (),
        ConsoleTraceType::Standard => layers.push(make_tracing_layer(
            std::io::stderr,
            filter.filter,
            time_format,
            filter.used_env,
            ansi_colours,
        )),
        ConsoleTraceType::Indicatif(mp) => layers.push(make_tracing_layer(
            ProgressWriter::wrap(mp),
            filter.filter,
            time_format,
            filter.used_env,
            ansi_colours,
        )),
    }

    if let Some(filename) = log_file {
        let out_file = Arc::new(File::create(filename).context("Failed to open log file")?);
        let filter = if std::env::var(LOG_FILE_DETAIL_ENV_VAR).is_ok() {
            FilterResult {
                filter: EnvFilter::try_from_env(LOG_FILE_DETAIL_ENV_VAR)?,
                used_env: true,
            }
        } else {
            filter_for(trace_level, STANDARD_ENV_VAR)?
        };
        layers.push(make_tracing_layer(
            out_file,
            filter.filter,
            time_format,
            filter.used_env,
            false,
        ));
    }
    Ok(layers)
}

/// Has [`setup`] already run?
#[must_use]
pub fn is_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::Relaxed)
}

/// Routes log lines through a [`MultiProgress`] so they print above the bars
struct ProgressWriter(MultiProgress);

impl ProgressWriter {
    fn wrap(display: MultiProgress) -> Mutex<Self> {
        Mutex::new(Self(display))
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = std::str::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let msg = maybe_strip_color(msg);
        if self.0.is_hidden() {
            eprint!("{msg}");
        } else {
            self.0.println(msg.trim_end())?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use indicatif::{MultiProgress, ProgressDrawTarget};
    use pretty_assertions::assert_eq;
    use rusty_fork::rusty_fork_test;
    use tracing_subscriber::EnvFilter;

    use super::{setup, setup_inner, trace_level, ConsoleTraceType, TimeFormat};

    #[test]
    fn trace_levels() {
        assert_eq!(trace_level(true, true), "debug");
        assert_eq!(trace_level(false, true), "error");
        assert_eq!(trace_level(false, false), "info");
    }

    #[test]
    fn time_format_is_case_insensitive() {
        let tf: TimeFormat = serde_json::from_str("\"UTC\"").unwrap();
        assert_eq!(tf, TimeFormat::Utc);
        let _ = serde_json::from_str::<TimeFormat>("\"martian\"").unwrap_err();
    }

    #[test]
    fn console_layer() {
        let layers = setup_inner(
            "info",
            ConsoleTraceType::Indicatif(MultiProgress::with_draw_target(
                ProgressDrawTarget::hidden(),
            )),
            None,
            TimeFormat::Local,
            false,
        )
        .unwrap();
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.log");
        let layers = setup_inner(
            "info",
            ConsoleTraceType::Standard,
            path.to_str(),
            TimeFormat::Utc,
            false,
        )
        .unwrap();
        assert_eq!(layers.len(), 2);
        assert!(path.exists());
    }

    #[test]
    fn invalid_level() {
        let result = setup_inner(
            "invalid_level",
            ConsoleTraceType::None,
            None,
            TimeFormat::Utc,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rfc3339_layer() {
        let _layer: super::BoxedLayer = super::make_tracing_layer(
            std::io::stderr,
            EnvFilter::new(""),
            TimeFormat::Rfc3339,
            false,
            false,
        );
    }

    #[test]
    fn progress_writer_hidden() {
        use std::io::Write as _;
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let mux = super::ProgressWriter::wrap(mp);
        let mut writer = mux.lock().unwrap();
        let msg = "a log line\n";
        assert_eq!(writer.write(msg.as_bytes()).unwrap(), msg.len());
        writer.flush().unwrap();
    }

    // global state: run in forks
    rusty_fork_test! {
        #[test]
        fn setup_twice() {
            setup("info", ConsoleTraceType::None, None, TimeFormat::Utc, false).unwrap();
            assert!(super::is_initialized());
            setup("debug", ConsoleTraceType::None, None, TimeFormat::Utc, false).unwrap();
        }
    }
}
