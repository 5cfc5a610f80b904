//! Main CLI for threadboard

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use super::args::{CliArgs, MainMode};
use super::styles::{use_colours, ERROR, RESET};
use crate::client::{Client, Repl, MAX_UPDATE_FPS};
use crate::config::{ConfigurationOverrides, Manager};
use crate::server::Server;
use crate::util::{setup_tracing, trace_level, ConsoleTraceType};

use anstream::{eprintln, println};
use anyhow::{Context as _, Result};
use indicatif::{MultiProgress, ProgressDrawTarget};
use tracing::info;

/// Main CLI entrypoint
///
/// Call this from `main`, passing the arguments to use.
/// Normally you will call `cli(std::env::args_os())` but you can pass in alternate arguments for CLI testing.
///
/// Starts a tokio runtime for the duration of the call.
#[must_use]
pub fn cli<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    cli_inner(args)
        .inspect_err(|e| {
            if crate::util::tracing_is_initialised() {
                tracing::error!("{e:#}");
            } else {
                eprintln!("{ERROR}Error:{RESET} {e:#}");
            }
        })
        .map_or(ExitCode::FAILURE, |success| {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        })
}

/// Inner CLI logic
///
/// # Return
/// true indicates success. false indicates a failure which has already been reported.
fn cli_inner<I, T>(args: I) -> Result<bool>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = parse_args(args)? else {
        return Ok(true); // help/version shown; exit
    };
    let manager = Manager::standard(args.config.as_deref())?;
    handle_mode(args, manager)
}

fn parse_args<I, T>(args: I) -> Result<Option<CliArgs>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    use clap::error::ErrorKind::{DisplayHelp, DisplayVersion};
    match CliArgs::custom_parse(args) {
        Ok(args) => Ok(Some(args)),
        Err(e) if matches!(e.kind(), DisplayHelp | DisplayVersion) => {
            let message = e.render();
            if use_colours() {
                println!("{}", message.ansi());
            } else {
                println!("{message}");
            }
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

// MODE HANDLERS ///////////////////////////////////////////////////////////

#[tokio::main(flavor = "current_thread")]
async fn handle_mode(args: CliArgs, manager: Manager) -> Result<bool> {
    let level = trace_level(args.debug, args.quiet);
    match args.mode {
        MainMode::ConfigFiles => {
            for f in Manager::config_files() {
                println!("{f}");
            }
            Ok(true)
        }
        MainMode::ShowConfig { overrides } => {
            println!("{}", show_config_data(manager, overrides)?);
            Ok(true)
        }
        MainMode::Server { port, overrides } => {
            run_server(manager, overrides, port, level, args.log_file.as_deref()).await
        }
        MainMode::Client {
            host,
            port,
            download_dir,
        } => {
            let params = ClientParams {
                host,
                port,
                download_dir,
                quiet: args.quiet,
            };
            run_client(manager, params, level, args.log_file.as_deref()).await
        }
    }
}

fn show_config_data(mut manager: Manager, overrides: ConfigurationOverrides) -> Result<String> {
    manager.merge_provider(overrides);
    manager.apply_system_default();
    let out = format!(
        "Server configuration:\n{}",
        manager.to_display_adapter()
    );
    let _ = manager.configuration()?;
    Ok(out)
}

async fn run_server(
    mut manager: Manager,
    overrides: ConfigurationOverrides,
    port: u16,
    level: &str,
    log_file: Option<&str>,
) -> Result<bool> {
    manager.merge_provider(overrides);
    manager.apply_system_default();
    let config = manager.configuration()?;
    setup_tracing(
        level,
        ConsoleTraceType::Standard,
        log_file,
        config.time_format,
        use_colours(),
    )?;

    let mut server = Server::bind(config, port)
        .await
        .context("[Server] failed to start")?;
    tokio::select! {
        result = server.run() => {
            result.context("[Server] failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for interrupt")?;
            info!("interrupted; shutting down");
        }
    }
    Ok(true)
}

#[derive(Debug)]
struct ClientParams {
    host: String,
    port: u16,
    download_dir: PathBuf,
    quiet: bool,
}

async fn run_client(
    mut manager: Manager,
    params: ClientParams,
    level: &str,
    log_file: Option<&str>,
) -> Result<bool> {
    manager.apply_system_default();
    let config = manager.configuration()?;
    let display = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(MAX_UPDATE_FPS));
    setup_tracing(
        level,
        ConsoleTraceType::Indicatif(display.clone()),
        log_file,
        config.time_format,
        use_colours(),
    )?;

    let server = tokio::net::lookup_host((params.host.as_str(), params.port))
        .await
        .with_context(|| format!("looking up {}", params.host))?
        .next()
        .with_context(|| format!("{} has no addresses", params.host))?;
    let client = Client::connect(server).await?;
    println!("Connected to {}", client.server());
    let mut repl = Repl::new(
        client,
        std::io::stdin().lock(),
        anstream::stdout(),
        display,
        params.quiet,
    )
    .with_download_dir(params.download_dir);
    repl.run().await
}
