//! Dial credentials
// (c) 2026 rescp developers

use anyhow::{Result, bail};
use tracing::warn;

/// Default ssh port, used when the address does not carry one
pub const DEFAULT_PORT: u16 = 22;

/// How we prove who we are
#[derive(Clone, PartialEq, Eq)]
pub enum Identity {
    /// Private key material (PEM or OpenSSH format)
    PrivateKey(String),
    /// Password
    Password(String),
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrivateKey(_) => write!(f, "PrivateKey(..)"),
            Self::Password(_) => write!(f, "Password(..)"),
        }
    }
}

/// Everything needed to (re)connect. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Remote user name
    pub user: String,
    /// `host` or `host:port`
    pub address: String,
    /// Authentication secret
    pub identity: Identity,
}

impl Credentials {
    /// Constructor.
    ///
    /// Exactly one of `private_key` and `password` is needed. If both are given the key wins.
    pub fn new(
        user: &str,
        address: &str,
        private_key: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        if address.is_empty() {
            bail!("remote address is required");
        }
        let identity = match (private_key, password) {
            (Some(key), pass) => {
                if pass.is_some() {
                    warn!("both a private key and a password were given; using the key");
                }
                Identity::PrivateKey(key)
            }
            (None, Some(pass)) => Identity::Password(pass),
            (None, None) => bail!("either a private key or a password is required"),
        };
        Ok(Self {
            user: user.to_owned(),
            address: address.to_owned(),
            identity,
        })
    }

    /// The address in `host:port` form, suitable for a socket connect
    #[must_use]
    pub fn host_port(&self) -> String {
        let (host, port) = split_host_port(&self.address);
        if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        }
    }
}

/// Splits `host[:port]` (or `[v6]:port`) into its parts, applying [`DEFAULT_PORT`].
#[must_use]
pub fn split_host_port(address: &str) -> (&str, u16) {
    if let Some(rest) = address.strip_prefix('[') {
        // [1:2::3]:port
        return match rest.split_once(']') {
            Some((host, tail)) => (
                host,
                tail.strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
            ),
            None => (address, DEFAULT_PORT),
        };
    }
    match address.rsplit_once(':') {
        // A bare IPv6 address has more than one colon and no port
        Some((host, port)) if !host.contains(':') => {
            (host, port.parse().unwrap_or(DEFAULT_PORT))
        }
        _ => (address, DEFAULT_PORT),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{Credentials, Identity, split_host_port};

    #[test]
    fn key_takes_precedence() {
        let c = Credentials::new("u", "h", Some("KEY".into()), Some("pw".into())).unwrap();
        assert_eq!(c.identity, Identity::PrivateKey("KEY".into()));
        let c = Credentials::new("u", "h", None, Some("pw".into())).unwrap();
        assert_eq!(c.identity, Identity::Password("pw".into()));
    }

    #[test]
    fn something_required() {
        assert!(Credentials::new("u", "h", None, None).is_err());
        assert!(Credentials::new("u", "", None, Some("pw".into())).is_err());
    }

    #[test]
    fn secrets_not_printed() {
        let c = Credentials::new("u", "h", None, Some("hunter2".into())).unwrap();
        assert!(!format!("{c:?}").contains("hunter2"));
    }

    #[rstest]
    #[case("example.com", "example.com", 22)]
    #[case("example.com:2222", "example.com", 2222)]
    #[case("10.0.0.1:23", "10.0.0.1", 23)]
    #[case("[::1]:2200", "::1", 2200)]
    #[case("[::1]", "::1", 22)]
    #[case("fe80::1", "fe80::1", 22)]
    fn host_port_split(#[case] input: &str, #[case] host: &str, #[case] port: u16) {
        assert_eq!(split_host_port(input), (host, port));
    }

    #[test]
    fn host_port_join() {
        let c = Credentials::new("u", "::1", None, Some("p".into())).unwrap();
        assert_eq!(c.host_port(), "[::1]:22");
        let c = Credentials::new("u", "h:99", None, Some("p".into())).unwrap();
        assert_eq!(c.host_port(), "h:99");
    }
}
