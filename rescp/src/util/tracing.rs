//! Log output
// (c) 2026 rescp developers

use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{
        format::Writer,
        time::{ChronoLocal, ChronoUtc, FormatTime},
    },
    prelude::*,
};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Overrides the console filter
const CONSOLE_FILTER_VAR: &str = "RUST_LOG";
/// Overrides the log file filter
const FILE_FILTER_VAR: &str = "RUST_LOG_FILE_DETAIL";

/// Maps the `--debug` and `--quiet` switches to a level
pub(crate) fn trace_level(debug: bool, quiet: bool) -> &'static str {
    match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "info",
    }
}

/// Selects the format of time stamps in output messages
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
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// Local time, as `2026-01-31 17:45:00L`
    #[default]
    Local,
    /// UTC, as `2026-01-31 17:45:00Z`
    Utc,
    /// Local time with offset, per [RFC 3339](https://datatracker.ietf.org/doc/html/rfc3339)
    Rfc3339,
}

/// Time stamp printer for a [`TimeFormat`]
enum Timestamp {
    Local(ChronoLocal),
    Utc(ChronoUtc),
}

impl From<TimeFormat> for Timestamp {
    fn from(format: TimeFormat) -> Self {
        match format {
            TimeFormat::Local => Self::Local(ChronoLocal::new("%Y-%m-%d %H:%M:%SL".into())),
            TimeFormat::Utc => Self::Utc(ChronoUtc::new("%Y-%m-%d %H:%M:%SZ".into())),
            TimeFormat::Rfc3339 => Self::Local(ChronoLocal::rfc_3339()),
        }
    }
}

impl FormatTime for Timestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        match self {
            Self::Local(t) => t.format_time(w),
            Self::Utc(t) => t.format_time(w),
        }
    }
}

/// Reads a filter from `var`, or logs our own events at `level` if it is unset.
///
/// Returns the filter, and whether it came from the environment.
fn env_filter(var: &str, level: &str) -> Result<(EnvFilter, bool)> {
    match std::env::var(var) {
        Ok(spec) => EnvFilter::try_new(&spec)
            .map(|f| (f, true))
            .with_context(|| format!("{var}={spec:?} was not understood")),
        Err(std::env::VarError::NotPresent) => Ok((EnvFilter::try_new(format!("rescp={level}"))?, false)),
        Err(e) => bail!("{var}: {e}"),
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn layers(
    level: &str,
    console: bool,
    log_file: Option<&str>,
    time_format: TimeFormat,
) -> Result<Vec<BoxedLayer>> {
    let mut out: Vec<BoxedLayer> = Vec::with_capacity(2);
    if console {
        let (filter, custom) = env_filter(CONSOLE_FILTER_VAR, level)?;
        // Event targets are only interesting when other crates may be logging too
        out.push(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(custom)
                .with_timer(Timestamp::from(time_format))
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
        );
    }
    if let Some(path) = log_file {
        let file = File::create(path).with_context(|| format!("creating log file {path}"))?;
        let (filter, custom) = if std::env::var_os(FILE_FILTER_VAR).is_some() {
            env_filter(FILE_FILTER_VAR, level)?
        } else {
            env_filter(CONSOLE_FILTER_VAR, level)?
        };
        out.push(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(false)
                .with_target(custom)
                .with_timer(Timestamp::from(time_format))
                .with_writer(std::sync::Arc::new(file))
                .with_filter(filter)
                .boxed(),
        );
    }
    Ok(out)
}

/// Installs the global subscriber: compact lines on stderr (if `console`), and optionally a log file.
///
/// Only the first call in a process has any effect.
/// If this fails nothing is installed, so the caller must report the error some other way.
pub(crate) fn setup(
    level: &str,
    console: bool,
    log_file: Option<&str>,
    time_format: TimeFormat,
) -> Result<()> {
    if INSTALLED.load(Ordering::Relaxed) {
        tracing::debug!("log output already set up");
        return Ok(());
    }
    tracing_subscriber::registry()
        .with(layers(level, console, log_file, time_format)?)
        .try_init()?;
    INSTALLED.store(true, Ordering::Relaxed);
    Ok(())
}

/// Is the global subscriber in place?
pub(crate) fn is_initialized() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}
