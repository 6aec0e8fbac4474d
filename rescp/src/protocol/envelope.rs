//! The scp sink file envelope
// (c) 2026 rescp developers

use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tracing::trace;

/// Permission bits the sink understands. Anything above these is file type information.
pub const MODE_MASK: u32 = 0o7777;

/// End-of-file marker sent after the payload
pub const TRAILER: u8 = 0;

/// Formats the control line that introduces a file.
///
/// The grammar is `C<mode> <size> <name>\n` where mode is octal with a leading zero.
#[must_use]
pub fn control_line(mode: u32, size: u64, file_name: &str) -> String {
    format!("C{:04o} {size} {file_name}\n", mode & MODE_MASK)
}

/// Writes a complete file envelope to `sink`: control line, exactly `size` bytes of
/// `contents`, then the trailer byte.
///
/// If `contents` yields fewer than `size` bytes the envelope would be corrupt, so this
/// is reported as [`std::io::ErrorKind::UnexpectedEof`].
/// Extra bytes beyond `size` are not read.
///
/// Returns the number of payload bytes written.
pub async fn encode<R, W>(
    size: u64,
    mode: u32,
    file_name: &str,
    contents: &mut R,
    sink: &mut W,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let header = control_line(mode, size, file_name);
    trace!("control line {:?}", header.trim_end());
    sink.write_all(header.as_bytes()).await?;

    let mut limited = contents.take(size);
    let copied = tokio::io::copy(&mut limited, sink).await?;
    if copied != size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("source ended after {copied} of {size} bytes"),
        ));
    }

    sink.write_all(&[TRAILER]).await?;
    sink.flush().await?;
    trace!("envelope complete");
    Ok(copied)
}

#[cfg(test)]
mod test {
    use std::io::ErrorKind;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{control_line, encode};

    #[rstest]
    #[case(0o644, 0, "empty.txt", "C0644 0 empty.txt\n")]
    #[case(0o755, 1234, "run.sh", "C0755 1234 run.sh\n")]
    #[case(0o4755, 1, "suid", "C4755 1 suid\n")]
    #[case(0o100_644, 7, "regular", "C0644 7 regular\n")]
    #[case(0o7, 3, "x", "C0007 3 x\n")]
    fn control_lines(
        #[case] mode: u32,
        #[case] size: u64,
        #[case] name: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(control_line(mode, size, name), expected);
    }

    #[tokio::test]
    async fn empty_file() {
        let mut out = Vec::new();
        let n = encode(0, 0o644, "empty.txt", &mut &b""[..], &mut out)
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(out, b"C0644 0 empty.txt\n\0");
    }

    #[tokio::test]
    async fn body_is_exact() {
        let payload = b"hello, world";
        let mut out = Vec::new();
        let _ = encode(5, 0o600, "h", &mut &payload[..], &mut out)
            .await
            .unwrap();
        let (line, rest) = out.split_at(out.iter().position(|b| *b == b'\n').unwrap() + 1);
        assert_eq!(line, b"C0600 5 h\n");
        assert_eq!(rest.len(), 6);
        assert_eq!(&rest[..5], b"hello");
        assert_eq!(rest.last(), Some(&0u8));
    }

    #[tokio::test]
    async fn short_source() {
        let mut out = Vec::new();
        let e = encode(10, 0o644, "short", &mut &b"abc"[..], &mut out)
            .await
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnexpectedEof);
        assert_ne!(out.last(), Some(&0u8));
    }

    #[tokio::test]
    async fn sink_error_propagates() {
        let mut sink = tokio_test::io::Builder::new()
            .write_error(std::io::Error::from(ErrorKind::BrokenPipe))
            .build();
        let e = encode(1, 0o644, "f", &mut &b"z"[..], &mut sink)
            .await
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::BrokenPipe);
    }
}
