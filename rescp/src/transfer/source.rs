//! Re-openable byte sources
// (c) 2026 rescp developers

use std::fmt::Debug;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::util::FsMetadataExt as _;

/// Permission bits used when the source has no metadata of its own
pub const DEFAULT_MODE: u32 = 0o644;

/// Type-erased reader for file contents
pub type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// A freshly opened source, positioned at byte zero
pub struct Opened {
    /// The contents
    pub reader: Reader,
    /// Exact number of bytes `reader` will yield
    pub size: u64,
    /// Permission bits to create the remote file with
    pub mode: u32,
}

impl Debug for Opened {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opened")
            .field("size", &self.size)
            .field("mode", &format_args!("{:04o}", self.mode))
            .finish_non_exhaustive()
    }
}

/// Something that can produce the contents of a file, from the beginning, as often as asked.
///
/// Every transfer attempt opens the source afresh, so retried attempts never see a
/// half-consumed stream.
#[async_trait]
pub trait Source: Send + Sync + Debug {
    /// Opens the source for reading from position zero
    async fn open(&self) -> std::io::Result<Opened>;
}

/// A file on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Constructor. The file is not touched until it is opened.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Accessor
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Source for FileSource {
    async fn open(&self) -> std::io::Result<Opened> {
        let file = tokio::fs::File::open(&self.path).await?;
        let meta = file.metadata().await?;
        if meta.is_dir() {
            return Err(Error::new(
                ErrorKind::IsADirectory,
                format!("{} is a directory", self.path.display()),
            ));
        }
        Ok(Opened {
            reader: Box::new(file),
            size: meta.len(),
            mode: meta.mode(),
        })
    }
}

/// An in-memory buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesSource {
    data: Arc<[u8]>,
    mode: u32,
}

impl BytesSource {
    /// Constructor, with the default mode
    pub fn new<D: Into<Arc<[u8]>>>(data: D) -> Self {
        Self {
            data: data.into(),
            mode: DEFAULT_MODE,
        }
    }

    /// Overrides the permission bits
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}

#[async_trait]
impl Source for BytesSource {
    async fn open(&self) -> std::io::Result<Opened> {
        Ok(Opened {
            reader: Box::new(std::io::Cursor::new(self.data.clone())),
            size: self.data.len() as u64,
            mode: self.mode,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::ErrorKind;

    use pretty_assertions::assert_eq;
    use tokio::io::AsyncReadExt as _;

    use super::{BytesSource, DEFAULT_MODE, FileSource, Source as _};

    #[tokio::test]
    async fn bytes_reopen_from_start() {
        let src = BytesSource::new(b"hello".to_vec());
        for _ in 0..2 {
            let mut opened = src.open().await.unwrap();
            assert_eq!(opened.size, 5);
            assert_eq!(opened.mode, DEFAULT_MODE);
            let mut buf = String::new();
            let _ = opened.reader.read_to_string(&mut buf).await.unwrap();
            assert_eq!(buf, "hello");
        }
    }

    #[tokio::test]
    async fn file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"0123456789").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }
        let source = FileSource::new(&path);
        assert_eq!(source.path(), path);
        let opened = source.open().await.unwrap();
        assert_eq!(opened.size, 10);
        #[cfg(unix)]
        assert_eq!(opened.mode, 0o600);
    }

    #[tokio::test]
    async fn missing_file() {
        let err = FileSource::new("/definitely/not/here").open().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::new(dir.path()).open().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsADirectory);
    }
}
