//! What a single transfer attempt sends
// (c) 2026 rescp developers

use super::source::{Opened, Reader, Source};
use crate::error::TransferError;
use crate::protocol::split_destination;

/// Everything one attempt needs. Consumed by the attempt.
pub struct Descriptor {
    /// Exact payload length
    pub size: u64,
    /// Permission bits for the remote file
    pub mode: u32,
    /// Name of the file to create
    pub file_name: String,
    /// Remote directory to create it in
    pub destination_dir: String,
    /// The payload
    pub contents: Reader,
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("size", &self.size)
            .field("mode", &format_args!("{:04o}", self.mode))
            .field("file_name", &self.file_name)
            .field("destination_dir", &self.destination_dir)
            .finish_non_exhaustive()
    }
}

impl Descriptor {
    /// Opens `source` afresh and pairs it with a remote destination path.
    pub async fn open(source: &dyn Source, destination: &str) -> Result<Self, TransferError> {
        let (destination_dir, file_name) = split_destination(destination)
            .map_err(|_| TransferError::Destination(destination.to_owned()))?;
        let Opened { reader, size, mode } = source.open().await.map_err(TransferError::Source)?;
        Ok(Self {
            size,
            mode,
            file_name,
            destination_dir,
            contents: reader,
        })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Descriptor;
    use crate::error::TransferError;
    use crate::transfer::source::{BytesSource, FileSource};

    #[tokio::test]
    async fn from_bytes() {
        let src = BytesSource::new(b"abc".to_vec()).with_mode(0o755);
        let d = Descriptor::open(&src, "/srv/data/abc.bin").await.unwrap();
        assert_eq!(d.size, 3);
        assert_eq!(d.mode, 0o755);
        assert_eq!(d.file_name, "abc.bin");
        assert_eq!(d.destination_dir, "/srv/data");
    }

    #[tokio::test]
    async fn bad_destination() {
        let src = BytesSource::new(Vec::new());
        let err = Descriptor::open(&src, "/").await.unwrap_err();
        assert!(matches!(err, TransferError::Destination(_)), "{err:?}");
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn missing_source() {
        let err = Descriptor::open(&FileSource::new("/no/such/file"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Source(_)), "{err:?}");
        assert!(err.is_permanent());
    }
}
