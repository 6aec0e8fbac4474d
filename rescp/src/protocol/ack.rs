//! Acknowledgements sent back by the sink
// (c) 2026 rescp developers
//!
//! The receiver answers each step with a single status byte.
//! A non-zero status is followed by a line of text explaining the problem.

/// One acknowledgement from the sink
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Ack {
    /// All good
    #[display("ok")]
    Ok,
    /// Something went wrong, but the receiver carried on
    #[display("warning: {_0}")]
    Warning(String),
    /// The receiver gave up
    #[display("error: {_0}")]
    Fatal(String),
}

/// Parses everything the sink wrote to its standard output.
///
/// Unknown status bytes are treated as fatal, with whatever follows as the message.
#[must_use]
pub fn parse(mut bytes: &[u8]) -> Vec<Ack> {
    let mut acks = Vec::new();
    while let Some((&status, rest)) = bytes.split_first() {
        if status == 0 {
            acks.push(Ack::Ok);
            bytes = rest;
            continue;
        }
        let (line, rest) = match rest.iter().position(|b| *b == b'\n') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, &[][..]),
        };
        let message = String::from_utf8_lossy(line).trim().to_string();
        acks.push(if status == 1 {
            Ack::Warning(message)
        } else {
            Ack::Fatal(message)
        });
        bytes = rest;
    }
    acks
}

/// Extracts a diagnostic message from the sink output, if it complained about anything.
#[must_use]
pub fn complaint(bytes: &[u8]) -> Option<String> {
    let messages: Vec<_> = parse(bytes)
        .into_iter()
        .filter_map(|a| match a {
            Ack::Ok => None,
            Ack::Warning(m) | Ack::Fatal(m) => Some(m),
        })
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Ack, complaint, parse};

    #[test]
    fn all_ok() {
        assert_eq!(parse(b"\0\0\0"), vec![Ack::Ok, Ack::Ok, Ack::Ok]);
        assert_eq!(complaint(b"\0\0\0"), None);
        assert_eq!(complaint(b""), None);
    }

    #[test]
    fn warning_after_ok() {
        let out = b"\0\x01scp: /nope: No such file or directory\n";
        assert_eq!(
            parse(out),
            vec![
                Ack::Ok,
                Ack::Warning("scp: /nope: No such file or directory".into())
            ]
        );
        assert_eq!(
            complaint(out).unwrap(),
            "scp: /nope: No such file or directory"
        );
    }

    #[test]
    fn unterminated_message() {
        assert_eq!(parse(b"\x02disk full"), vec![Ack::Fatal("disk full".into())]);
    }

    #[test]
    fn display() {
        assert_eq!(Ack::Fatal("x".into()).to_string(), "error: x");
        assert_eq!(Ack::Ok.to_string(), "ok");
    }
}
