//! Optional gzip pre-processing
// (c) 2026 rescp developers

use std::io::Write as _;

use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::io::AsyncReadExt as _;
use tracing::debug;

use super::descriptor::Descriptor;
use crate::error::TransferError;

/// Suffix appended to the name of compressed files
pub const SUFFIX: &str = ".gz";

/// Compresses a buffer with gzip
pub fn gzip_bytes(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Transforms a descriptor into one carrying the gzip-compressed payload.
///
/// The sink needs the exact size up front, so the whole compressed output is held in memory.
pub async fn gzip(descriptor: Descriptor) -> Result<Descriptor, TransferError> {
    let Descriptor {
        size,
        mode,
        file_name,
        destination_dir,
        contents,
    } = descriptor;

    let mut plain = Vec::new();
    let read = contents
        .take(size)
        .read_to_end(&mut plain)
        .await
        .map_err(TransferError::Source)?;
    if read as u64 != size {
        return Err(TransferError::Source(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("source ended after {read} of {size} bytes"),
        )));
    }

    let packed = tokio::task::spawn_blocking(move || gzip_bytes(&plain))
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))?
        .map_err(TransferError::Io)?;
    debug!("compressed {file_name}: {size} -> {} bytes", packed.len());

    Ok(Descriptor {
        size: packed.len() as u64,
        mode,
        file_name: format!("{file_name}{SUFFIX}"),
        destination_dir,
        contents: Box::new(std::io::Cursor::new(packed)),
    })
}

#[cfg(test)]
mod test {
    use std::io::Read as _;

    use flate2::read::GzDecoder;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncReadExt as _;

    use super::gzip;
    use crate::error::TransferError;
    use crate::transfer::descriptor::Descriptor;
    use crate::transfer::source::BytesSource;

    fn sample() -> Vec<u8> {
        b"all work and no play makes jack a dull boy\n".repeat(200)
    }

    #[tokio::test]
    async fn round_trip() {
        let original = sample();
        let d = Descriptor::open(&BytesSource::new(original.clone()), "/tmp/log.txt")
            .await
            .unwrap();
        let mut packed = gzip(d).await.unwrap();
        assert_eq!(packed.file_name, "log.txt.gz");
        assert_eq!(packed.destination_dir, "/tmp");
        assert_eq!(packed.mode, 0o644);

        let mut bytes = Vec::new();
        let _ = packed.contents.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(packed.size, bytes.len() as u64);
        assert!(packed.size < original.len() as u64);

        let mut unpacked = Vec::new();
        let _ = GzDecoder::new(&bytes[..])
            .read_to_end(&mut unpacked)
            .unwrap();
        assert_eq!(unpacked, original);
    }

    #[tokio::test]
    async fn empty_input() {
        let d = Descriptor::open(&BytesSource::new(Vec::new()), "empty.txt")
            .await
            .unwrap();
        let packed = gzip(d).await.unwrap();
        assert_eq!(packed.file_name, "empty.txt.gz");
        // gzip always has a header and trailer
        assert!(packed.size > 0);
    }

    #[tokio::test]
    async fn short_source() {
        let mut d = Descriptor::open(&BytesSource::new(b"abc".to_vec()), "x")
            .await
            .unwrap();
        d.size = 10;
        let err = gzip(d).await.unwrap_err();
        assert!(matches!(err, TransferError::Source(_)), "{err:?}");
    }
}
