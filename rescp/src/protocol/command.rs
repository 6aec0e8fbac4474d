//! Remote sink command construction
// (c) 2026 rescp developers

use std::fmt::Display;
use std::path::Path;

use anyhow::{Result, anyhow};

/// Extra options passed to the remote `scp -t` receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// Bandwidth limit in kilobytes per second; `None` for unlimited.
    pub limit_kb: Option<u32>,
}

impl Flags {
    /// Flags for a given limit in KB/s. Zero means unlimited.
    #[must_use]
    pub fn with_limit_kb(kb: u32) -> Self {
        Self {
            limit_kb: (kb > 0).then_some(kb),
        }
    }
}

impl Display for Flags {
    /// scp wants the limit in kilobits per second
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.limit_kb {
            Some(kb) => write!(f, "-l {}", u64::from(kb) * 8),
            None => Ok(()),
        }
    }
}

/// Builds the command line that runs the sink on the remote host.
#[must_use]
pub fn remote_command(flags: Flags, destination_dir: &str) -> String {
    let flags = flags.to_string();
    if flags.is_empty() {
        format!("scp -t {destination_dir}")
    } else {
        format!("scp {flags} -t {destination_dir}")
    }
}

/// Splits a destination path into the directory to run the sink in, and the file name to create.
///
/// A bare file name lands in the remote login directory (`.`).
pub fn split_destination(destination: &str) -> Result<(String, String)> {
    let path = Path::new(destination);
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("destination {destination:?} does not name a file"))?
        .to_string_lossy()
        .to_string();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().to_string(),
        _ => ".".to_owned(),
    };
    Ok((dir, name))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{Flags, remote_command, split_destination};

    #[test]
    fn limit_flags() {
        assert_eq!(Flags::with_limit_kb(100).to_string(), "-l 800");
        assert_eq!(Flags::with_limit_kb(0).to_string(), "");
        assert_eq!(Flags::default().to_string(), "");
    }

    #[test]
    fn commands() {
        assert_eq!(remote_command(Flags::default(), "/tmp"), "scp -t /tmp");
        assert_eq!(
            remote_command(Flags::with_limit_kb(100), "/data/in"),
            "scp -l 800 -t /data/in"
        );
    }

    #[rstest]
    #[case("/var/tmp/file.txt", "/var/tmp", "file.txt")]
    #[case("file.txt", ".", "file.txt")]
    #[case("sub/file", "sub", "file")]
    #[case("/file", "/", "file")]
    fn destinations(#[case] input: &str, #[case] dir: &str, #[case] name: &str) {
        let (d, n) = split_destination(input).unwrap();
        assert_eq!(d, dir);
        assert_eq!(n, name);
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("foo/..")]
    fn bad_destinations(#[case] input: &str) {
        assert!(split_destination(input).is_err());
    }
}
