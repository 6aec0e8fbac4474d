//! Configuration structure
// (c) 2026 rescp developers

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::helper::Helper;
use crate::protocol::Flags;
use crate::retry::{Backoff, RetryPolicy};
use crate::transport::{
    Credentials, Dialer,
    ssh_client::{SshClientDialer, SshClientSettings},
};
use crate::util::TimeFormat;

/// Which transport implementation to use
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    clap::ValueEnum,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Built-in ssh client (libssh2). Supports private keys and passwords.
    Libssh2,
    /// The system `ssh` program. Supports key files only.
    SshClient,
}

/// Which retry policy to apply
#[derive(
    Copy,
    Clone,
    Debug,
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
pub enum RetryKind {
    /// One attempt only
    Single,
    /// Up to `attempts` attempts
    Bounded,
    /// Retry until success (or the deadline, or Ctrl-C)
    Unbounded,
}

/// The set of configurable options supported by rescp.
///
/// In configuration files, these are given in snake case (`limit_kb = 100`).
/// As environment variables, they are upper case with a `RESCP_` prefix (`RESCP_LIMIT_KB=100`).
/// On the command line they are kebab case (`--limit-kb 100`); see [`ConfigurationArgs`].
///
/// There is no `default()`. The hard-wired defaults are in [`Configuration::system_default()`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    // CONNECTION ======================================================================
    /// User to log in as. Empty means the local user name (ssh-client) or is an error (libssh2).
    pub remote_user: String,
    /// Remote host, as `host` or `host:port`
    pub address: String,
    /// Private key file. Empty for none.
    pub identity_file: String,
    /// Password. Empty for none. A private key takes precedence.
    pub password: String,
    /// Transport implementation
    pub transport: TransportKind,
    /// ssh client program (ssh-client transport only)
    pub ssh: String,
    /// Extra arguments for the ssh client (ssh-client transport only)
    pub ssh_options: Vec<String>,
    /// Connection timeout, seconds
    pub connect_timeout: u16,

    // TRANSFER ========================================================================
    /// Transfer rate limit in kilobytes per second; 0 for unlimited
    pub limit_kb: u32,
    /// Compress with gzip before sending (adds `.gz` to the remote name)
    pub gzip: bool,

    // RETRY ===========================================================================
    /// Retry policy
    pub retry: RetryKind,
    /// Maximum attempts, for the bounded policy
    pub attempts: u32,
    /// Linear backoff unit, milliseconds
    pub backoff_unit_ms: u64,
    /// Last attempt to use linear backoff
    pub backoff_linear_limit: u32,
    /// Delay between attempts once linear backoff is exhausted, seconds
    pub backoff_ceiling_secs: u64,
    /// Overall time limit in seconds; 0 for none
    pub deadline: u64,
    /// Give up immediately on errors that retrying cannot fix
    pub stop_on_permanent: bool,

    // OUTPUT ==========================================================================
    /// Time format for log messages
    pub time_format: TimeFormat,
}

/// Field names, in display order
pub(crate) const FIELD_NAMES: &[&str] = &[
    "remote_user",
    "address",
    "identity_file",
    "password",
    "transport",
    "ssh",
    "ssh_options",
    "connect_timeout",
    "limit_kb",
    "gzip",
    "retry",
    "attempts",
    "backoff_unit_ms",
    "backoff_linear_limit",
    "backoff_ceiling_secs",
    "deadline",
    "stop_on_permanent",
    "time_format",
];

static SYSTEM_DEFAULT_CONFIG: LazyLock<Configuration> = LazyLock::new(|| Configuration {
    remote_user: String::new(),
    address: String::new(),
    identity_file: String::new(),
    password: String::new(),
    transport: if cfg!(feature = "libssh2") {
        TransportKind::Libssh2
    } else {
        TransportKind::SshClient
    },
    ssh: "ssh".into(),
    ssh_options: Vec::new(),
    connect_timeout: 10,
    limit_kb: 0,
    gzip: false,
    retry: RetryKind::Bounded,
    attempts: 3,
    backoff_unit_ms: 1000,
    backoff_linear_limit: 10,
    backoff_ceiling_secs: 60,
    deadline: 0,
    stop_on_permanent: false,
    time_format: TimeFormat::Local,
});

impl Configuration {
    /// Returns the system default settings
    #[must_use]
    pub fn system_default() -> &'static Self {
        &SYSTEM_DEFAULT_CONFIG
    }

    /// Checks the fields that can be checked without touching the filesystem or network
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            bail!("no remote address was given");
        }
        if self.retry == RetryKind::Bounded && self.attempts == 0 {
            bail!("attempts must be at least 1 for the bounded retry policy");
        }
        if self.backoff_unit_ms == 0 && self.retry != RetryKind::Single {
            warn!("backoff_unit_ms is 0; retries will not be spaced out");
        }
        match self.transport {
            TransportKind::Libssh2 => {
                if self.identity_file.is_empty() && self.password.is_empty() {
                    bail!("either identity_file or password is required");
                }
                if self.remote_user.is_empty() {
                    bail!("remote_user is required");
                }
            }
            TransportKind::SshClient => {
                if !self.password.is_empty() {
                    if self.identity_file.is_empty() {
                        bail!("password authentication requires the libssh2 transport");
                    }
                    warn!("the ssh-client transport ignores the password");
                }
            }
        }
        Ok(())
    }

    /// Connection timeout, as a Duration
    #[must_use]
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout.into())
    }

    /// Overall deadline, if any
    #[must_use]
    pub fn deadline_duration(&self) -> Option<Duration> {
        (self.deadline > 0).then(|| Duration::from_secs(self.deadline))
    }

    /// The configured backoff schedule
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            unit: Duration::from_millis(self.backoff_unit_ms),
            linear_limit: self.backoff_linear_limit,
            ceiling: Duration::from_secs(self.backoff_ceiling_secs),
        }
    }

    /// The configured retry policy
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.retry {
            RetryKind::Single => RetryPolicy::Single,
            RetryKind::Bounded => RetryPolicy::bounded(self.attempts).with_backoff(self.backoff()),
            RetryKind::Unbounded => RetryPolicy::unbounded().with_backoff(self.backoff()),
        }
    }

    /// Flags for the remote sink
    #[must_use]
    pub fn flags(&self) -> Flags {
        Flags::with_limit_kb(self.limit_kb)
    }

    /// The identity file path, with a leading `~/` expanded
    #[must_use]
    pub fn identity_path(&self) -> Option<PathBuf> {
        if self.identity_file.is_empty() {
            return None;
        }
        if let Some(rest) = self.identity_file.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return Some(home.join(rest));
            }
        }
        Some(PathBuf::from(&self.identity_file))
    }

    /// Builds dial credentials, reading the private key file if there is one
    pub fn credentials(&self) -> Result<Credentials> {
        let key = self
            .identity_path()
            .map(|p| {
                std::fs::read_to_string(&p)
                    .with_context(|| format!("reading identity file {}", p.display()))
            })
            .transpose()?;
        let password = (!self.password.is_empty()).then(|| self.password.clone());
        Credentials::new(&self.remote_user, &self.address, key, password)
    }

    /// Builds the dialer for the configured transport
    pub fn dialer(&self) -> Result<Box<dyn Dialer>> {
        Ok(match self.transport {
            #[cfg(feature = "libssh2")]
            TransportKind::Libssh2 => Box::new(crate::transport::libssh2::Libssh2Dialer::new(
                self.credentials()?,
                self.connect_timeout_duration(),
            )),
            #[cfg(not(feature = "libssh2"))]
            TransportKind::Libssh2 => bail!("this build of rescp does not include libssh2"),
            TransportKind::SshClient => Box::new(SshClientDialer::new(SshClientSettings {
                program: self.ssh.clone(),
                options: self.ssh_options.clone(),
                user: self.remote_user.clone(),
                address: self.address.clone(),
                identity_file: self.identity_path(),
                connect_timeout: self.connect_timeout_duration(),
            })),
        })
    }

    /// Builds a [`Helper`] with everything configured
    pub fn helper(&self) -> Result<Helper> {
        self.validate()?;
        let mut helper = Helper::new(self.dialer()?)
            .with_backoff(self.backoff())
            .with_deadline(self.deadline_duration())
            .with_stop_on_permanent(self.stop_on_permanent);
        helper.set_limit_kb(self.limit_kb);
        helper.set_gzip(self.gzip);
        Ok(helper)
    }
}

/// Command-line form of [`Configuration`].
///
/// Every field is optional; anything not given here falls through to the environment,
/// configuration files and system defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args, Serialize, Deserialize)]
pub struct ConfigurationArgs {
    /// Specifies the user on the remote machine to connect as.
    ///
    /// This is functionally the same as specifying a remote filename `user@host:file`.
    #[arg(
        short = 'l',
        long,
        value_name("login_name"),
        help_heading("Connection"),
        display_order(0)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_user: Option<String>,

    /// The remote host, as `host` or `host:port` [default port: 22]
    ///
    /// The host part of a `host:file` destination takes precedence.
    #[arg(long, value_name("host[:port]"), help_heading("Connection"), display_order(0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Private key file to authenticate with
    #[arg(
        short = 'i',
        long,
        value_name("FILE"),
        help_heading("Connection"),
        display_order(0)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,

    /// Password to authenticate with (libssh2 transport only).
    ///
    /// Consider setting `RESCP_PASSWORD` in the environment instead, which is not visible to other users.
    #[arg(long, value_name("PASSWORD"), help_heading("Connection"), display_order(0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Selects the transport [default: libssh2]
    #[arg(long, value_name("transport"), help_heading("Connection"), display_order(0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,

    /// Specifies the ssh client program to use (ssh-client transport) [default: `ssh`]
    #[arg(
        long,
        help_heading("Connection"),
        display_order(0),
        value_name("ssh-client")
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<String>,

    /// Provides an additional option or argument to pass to the ssh client (ssh-client transport).
    ///
    /// **On the command line** you must repeat `-S` for each argument.
    /// For example, to pass `-F /dev/null` to ssh, specify: `-S -F -S /dev/null`
    #[arg(
        short = 'S',
        value_name("ssh-option"),
        allow_hyphen_values(true),
        help_heading("Connection"),
        display_order(0)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_options: Option<Vec<String>>,

    /// Connection timeout [seconds; default 10]
    #[arg(long, value_name("sec"), help_heading("Connection"), display_order(0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u16>,

    /// Limits the transfer rate, in kilobytes per second [default: 0, unlimited]
    #[arg(
        long,
        value_name("KB/s"),
        help_heading("Transfer"),
        display_order(0)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_kb: Option<u32>,

    /// Compresses the file with gzip before sending. The remote file gains a `.gz` suffix.
    #[arg(
        short = 'z',
        long,
        default_missing_value("true"),
        num_args(0..=1),
        require_equals(true),
        help_heading("Transfer"),
        display_order(0)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gzip: Option<bool>,

    /// Retry policy [default: bounded]
    #[arg(long, value_name("policy"), help_heading("Retry"), display_order(0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryKind>,

    /// Maximum number of attempts for the bounded policy [default: 3]
    #[arg(short = 'n', long, value_name("N"), help_heading("Retry"), display_order(0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,

    /// Linear backoff unit [milliseconds; default 1000]
    ///
    /// Attempt N waits N units, up to the linear limit.
    #[arg(long, value_name("ms"), help_heading("Retry"), display_order(10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_unit_ms: Option<u64>,

    /// Last attempt that uses linear backoff [default: 10]
    #[arg(long, value_name("N"), help_heading("Retry"), display_order(10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_linear_limit: Option<u32>,

    /// Delay between attempts after the linear limit [seconds; default 60]
    #[arg(long, value_name("sec"), help_heading("Retry"), display_order(10))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_ceiling_secs: Option<u64>,

    /// Gives up after this long overall [seconds; default 0, no limit]
    #[arg(long, value_name("sec"), help_heading("Retry"), display_order(0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,

    /// Stops retrying at once on errors that retrying cannot fix, such as a missing local file
    #[arg(
        long,
        default_missing_value("true"),
        num_args(0..=1),
        require_equals(true),
        help_heading("Retry"),
        display_order(0)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_on_permanent: Option<bool>,

    /// Specifies the time format to use when printing messages to the console or to file
    /// [default: local]
    #[arg(
        short = 'T',
        long,
        value_name("FORMAT"),
        help_heading("Output"),
        next_line_help(true),
        display_order(0)
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,
}
