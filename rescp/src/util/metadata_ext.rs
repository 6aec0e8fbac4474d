//! Extension trait for std::fs::Metadata
// (c) 2026 rescp developers

use crate::protocol::envelope::MODE_MASK;

/// Extension trait for `std::fs::Metadata`
pub(crate) trait FsMetadataExt {
    /// Extract the Unix mode bits, or a facsimile
    fn mode(&self) -> u32;
}

impl FsMetadataExt for std::fs::Metadata {
    #[cfg(unix)]
    fn mode(&self) -> u32 {
        use std::os::unix::fs::PermissionsExt as _;
        self.permissions().mode() & MODE_MASK
    }
    #[cfg(not(unix))]
    fn mode(&self) -> u32 {
        // No execute bit, and nothing finer-grained than read-only.
        if self.permissions().readonly() {
            0o444
        } else {
            0o644
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod test {
    use std::os::unix::fs::PermissionsExt as _;

    use super::FsMetadataExt as _;

    #[test]
    fn mode_bits() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o640)).unwrap();
        let meta = std::fs::metadata(file.path()).unwrap();
        assert_eq!(meta.mode(), 0o640);
    }
}
