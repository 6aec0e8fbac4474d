//! Command-line arguments
// (c) 2026 rescp developers

use std::str::FromStr;

use clap::Parser;
use figment::providers::Serialized;

use crate::config::{ConfigurationArgs, Manager};

/// A destination given by the user: `[user@]host:path`, or just `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemoteSpec {
    /// Login name, if given
    pub(crate) user: Option<String>,
    /// Remote host, if given. IPv6 addresses have their brackets removed.
    pub(crate) host: Option<String>,
    /// Remote path, which must end in a file name
    pub(crate) path: String,
}

impl FromStr for RemoteSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_at_host, path) = if s.starts_with('[') || s.contains("@[") {
            // [1:2:3::4]:path, user@[1:2::3]:path
            match s.split_once("]:") {
                Some((hostish, path)) => (Some(hostish.replacen('[', "", 1)), path),
                None => (None, s),
            }
        } else {
            match s.split_once(':') {
                Some((host, path)) => (Some(host.to_owned()), path),
                None => (None, s),
            }
        };
        let (user, host) = match user_at_host {
            Some(uh) => match uh.split_once('@') {
                Some((user, host)) => (Some(user.to_owned()), Some(host.to_owned())),
                None => (None, Some(uh)),
            },
            None => (None, None),
        };
        if host.as_deref() == Some("") {
            anyhow::bail!("empty host name in {s:?}");
        }
        Ok(Self {
            user: user.filter(|u| !u.is_empty()),
            host,
            path: path.to_owned(),
        })
    }
}

impl std::fmt::Display for RemoteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        match &self.host {
            Some(host) if host.contains(':') => write!(f, "[{host}]:")?,
            Some(host) => write!(f, "{host}:")?,
            None => (),
        }
        write!(f, "{}", self.path)
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "Copies a single local file to a remote host over ssh, using the scp sink protocol.\n\n\
        The connection is re-established transparently if it drops, and failed transfers are retried \
        according to the configured policy.",
    infer_long_args(true)
)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliArgs {
    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=rescp=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Debug"), display_order(0))]
    pub(crate) debug: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(
        long,
        action,
        value_name("FILE"),
        help_heading("Output"),
        next_line_help(true),
        display_order(0)
    )]
    pub(crate) log_file: Option<String>,

    /// Quiet mode: reports only errors
    #[arg(short, long, action, conflicts_with("debug"), help_heading("Output"))]
    pub(crate) quiet: bool,

    /// Outputs the configuration, then exits.
    ///
    /// If SOURCE and DESTINATION are also given, the destination's `user@host` part is applied first.
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub(crate) show_config: bool,

    /// Outputs the paths to configuration file(s), then exits
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub(crate) config_files: bool,

    #[command(flatten)]
    pub(crate) config: ConfigurationArgs,

    /// The local file to send
    #[arg(
        value_name = "SOURCE",
        required_unless_present_any(["show_config", "config_files"])
    )]
    pub(crate) source: Option<String>,

    /// Where to put it, as `[user@]host:path` or simply `path`.
    ///
    /// The path must end in a file name. If the host is omitted, the configured `address` is used.
    #[arg(
        value_name = "DESTINATION",
        required_unless_present_any(["show_config", "config_files"])
    )]
    pub(crate) destination: Option<RemoteSpec>,
}

impl CliArgs {
    /// Command-line options, with the destination's `user@host` folded in
    pub(crate) fn overrides(&self) -> ConfigurationArgs {
        let mut args = self.config.clone();
        if let Some(dest) = &self.destination {
            if let Some(host) = &dest.host {
                args.address = Some(host.clone());
            }
            if let Some(user) = &dest.user {
                args.remote_user = Some(user.clone());
            }
        }
        args
    }
}

impl From<&CliArgs> for Manager {
    fn from(args: &CliArgs) -> Self {
        let mut mgr = Manager::standard();
        mgr.merge_provider(Serialized::defaults(args.overrides()));
        mgr.apply_system_default();
        mgr
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr as _;

    use clap::Parser as _;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{CliArgs, RemoteSpec};

    #[rstest]
    #[case("/dir/file", None, None, "/dir/file")]
    #[case("host:file", None, Some("host"), "file")]
    #[case("host:", None, Some("host"), "")]
    #[case("me@host:/srv/x.bin", Some("me"), Some("host"), "/srv/x.bin")]
    #[case("[::1]:up/x", None, Some("::1"), "up/x")]
    #[case("me@[fe80::2]:y", Some("me"), Some("fe80::2"), "y")]
    #[case("@host:y", None, Some("host"), "y")]
    fn remote_spec(
        #[case] input: &str,
        #[case] user: Option<&str>,
        #[case] host: Option<&str>,
        #[case] path: &str,
    ) {
        let spec = RemoteSpec::from_str(input).unwrap();
        assert_eq!(spec.user.as_deref(), user);
        assert_eq!(spec.host.as_deref(), host);
        assert_eq!(spec.path, path);
    }

    #[test]
    fn remote_spec_display() {
        for s in ["me@host:file", "[::1]:x", "plain"] {
            assert_eq!(RemoteSpec::from_str(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn empty_host() {
        assert!(RemoteSpec::from_str(":file").is_err());
        assert!(RemoteSpec::from_str("me@:file").is_err());
    }

    #[test]
    fn positionals_required() {
        assert!(CliArgs::try_parse_from(["rescp"]).is_err());
        assert!(CliArgs::try_parse_from(["rescp", "x"]).is_err());
        assert!(CliArgs::try_parse_from(["rescp", "--show-config"]).is_ok());
    }

    #[test]
    fn destination_overrides_config() {
        let args = CliArgs::try_parse_from([
            "rescp",
            "--address",
            "elsewhere",
            "-l",
            "nobody",
            "--limit-kb",
            "100",
            "local.txt",
            "me@host:/srv/local.txt",
        ])
        .unwrap();
        let o = args.overrides();
        assert_eq!(o.address.as_deref(), Some("host"));
        assert_eq!(o.remote_user.as_deref(), Some("me"));
        assert_eq!(o.limit_kb, Some(100));
        assert_eq!(args.source.as_deref(), Some("local.txt"));
    }

    #[test]
    fn bare_path_keeps_address() {
        let args =
            CliArgs::try_parse_from(["rescp", "--address", "h:2222", "a", "/tmp/a"]).unwrap();
        assert_eq!(args.overrides().address.as_deref(), Some("h:2222"));
    }

    #[test]
    fn switches() {
        let args = CliArgs::try_parse_from([
            "rescp", "-z", "--retry", "unbounded", "-S", "-F", "-S", "/dev/null", "a", "h:b",
        ])
        .unwrap();
        assert_eq!(args.config.gzip, Some(true));
        assert_eq!(args.config.retry, Some(crate::config::RetryKind::Unbounded));
        assert_eq!(
            args.config.ssh_options,
            Some(vec!["-F".to_owned(), "/dev/null".to_owned()])
        );
        assert!(CliArgs::try_parse_from(["rescp", "-d", "-q", "a", "h:b"]).is_err());
    }
}
