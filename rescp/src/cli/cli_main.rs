//! Main CLI for rescp
// (c) 2026 rescp developers

use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser as _;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::args::CliArgs;
use crate::{
    config::{Configuration, Manager},
    transfer::FileSource,
    util::{setup_tracing, trace_level},
};

/// Main CLI entrypoint
///
/// Call this from `main`, passing the arguments to use.
/// Normally you will call `cli(std::env::args_os())` but you can pass in alternate arguments for CLI testing.
///
/// # Note
/// This function may start a tokio runtime and perform work in it, and may set up global tracing.
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
                eprintln!("Error: {e:#}");
            }
        })
        .map_or(ExitCode::FAILURE, |()| ExitCode::SUCCESS)
}

fn cli_inner<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = parse_args(args)? else {
        return Ok(()); // help/version shown; exit
    };

    if args.config_files {
        for f in Manager::config_files() {
            println!("{f}");
        }
        return Ok(());
    }

    let manager = Manager::from(&*args);
    if args.show_config {
        println!("{}", show_config_data(&manager));
        let _ = manager.configuration()?;
        return Ok(());
    }

    let config = manager.configuration()?;
    setup_tracing(
        trace_level(args.debug, args.quiet),
        true,
        args.log_file.as_deref(),
        config.time_format,
    )?;
    manager.warn_unknown_fields();

    // clap has already insisted on both
    let source = args.source.unwrap_or_default();
    let destination = args.destination.map(|d| d.path).unwrap_or_default();
    run_transfer(&config, &source, &destination)
}

fn parse_args<I, T>(args: I) -> Result<Option<Box<CliArgs>>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    use clap::error::ErrorKind::{DisplayHelp, DisplayVersion};
    match CliArgs::try_parse_from(args) {
        Ok(args) => Ok(Some(Box::new(args))),
        Err(e) if matches!(e.kind(), DisplayHelp | DisplayVersion) => {
            e.print().context("printing help")?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn show_config_data(manager: &Manager) -> String {
    format!("Configuration:\n{}", manager.display())
}

/// Cancels the token when the user presses Ctrl-C
fn cancel_on_interrupt(cancel: CancellationToken) {
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; giving up");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn run_transfer(config: &Configuration, source: &str, destination: &str) -> Result<()> {
    let helper = config.helper()?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let result = helper
        .transfer(
            &FileSource::new(source),
            destination,
            config.retry_policy(),
            &cancel,
        )
        .await;
    helper.disconnect().await;
    let _ = result?;
    Ok(())
}

#[cfg(test)]
mod test {
    use assertables::assert_contains;
    use figment::providers::Serialized;

    use super::{cli, show_config_data};
    use crate::config::{ConfigurationArgs, Manager};

    #[test]
    fn show_config() {
        let mut mgr = Manager::without_files();
        mgr.merge_provider(Serialized::defaults(ConfigurationArgs {
            address: Some("example.com".into()),
            ..Default::default()
        }));
        let data = show_config_data(&mgr);
        assert_contains!(data, "Configuration:");
        assert_contains!(data, "example.com");
        assert_contains!(data, "backoff_ceiling_secs");
    }

    #[test]
    fn help_and_version() {
        assert_eq!(cli(["rescp", "--help"]), std::process::ExitCode::SUCCESS);
        assert_eq!(cli(["rescp", "--version"]), std::process::ExitCode::SUCCESS);
    }

    #[test]
    fn bad_usage() {
        assert_eq!(cli(["rescp", "--no-such-option"]), std::process::ExitCode::FAILURE);
        assert_eq!(cli(["rescp", "onlyone"]), std::process::ExitCode::FAILURE);
    }
}
