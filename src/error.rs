use thiserror::Error;

/// Opaque error produced by a [`ChunkCodec`](crate::chunks::ChunkCodec).
pub type CodecError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for block decoding operations.
///
/// Format errors (`InvalidSize`, `InvalidFlag`, `InvalidLength`, `InvalidMagic`,
/// `InvalidUtf8`, `ChecksumMismatch`, `Section`) mean the block is corrupt or was written
/// in an incompatible format. `NotFound` is an expected miss on a lookup key. `Codec` is
/// passed through from the chunk codec untouched.
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("invalid size")]
    InvalidSize,

    #[error("invalid flag {0:#04x}")]
    InvalidFlag(u8),

    #[error("invalid length")]
    InvalidLength,

    #[error("invalid magic number {found:#010x} (expected {expected:#010x})")]
    InvalidMagic { expected: u32, found: u32 },

    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("checksum mismatch in section at offset {offset}: expected={expected:#010x}, actual={actual:#010x}")]
    ChecksumMismatch {
        offset: u32,
        expected: u32,
        actual: u32,
    },

    #[error("section at offset {offset}: {source}")]
    Section {
        offset: u32,
        #[source]
        source: Box<BlockError>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("chunk codec: {0}")]
    Codec(#[source] CodecError),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl BlockError {
    /// Returns true for an absent lookup key (label index or postings entry).
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlockError::NotFound(_))
    }

    /// Returns true if the error indicates corrupt or incompatible block data.
    pub fn is_corruption(&self) -> bool {
        match self {
            BlockError::InvalidSize
            | BlockError::InvalidFlag(_)
            | BlockError::InvalidLength
            | BlockError::InvalidMagic { .. }
            | BlockError::InvalidUtf8(_)
            | BlockError::ChecksumMismatch { .. } => true,
            BlockError::Section { source, .. } => source.is_corruption(),
            BlockError::NotFound(_)
            | BlockError::Codec(_)
            | BlockError::Io(_)
            | BlockError::Config(_) => false,
        }
    }

    pub(crate) fn in_section(self, offset: u32) -> Self {
        match self {
            already @ BlockError::Section { .. } => already,
            other => BlockError::Section {
                offset,
                source: Box::new(other),
            },
        }
    }
}

impl From<std::string::FromUtf8Error> for BlockError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        BlockError::InvalidUtf8(err.to_string())
    }
}

impl From<std::str::Utf8Error> for BlockError {
    fn from(err: std::str::Utf8Error) -> Self {
        BlockError::InvalidUtf8(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_context_wraps_once() {
        let err = BlockError::InvalidSize.in_section(12).in_section(40);
        match err {
            BlockError::Section { offset, source } => {
                assert_eq!(offset, 12);
                assert!(matches!(*source, BlockError::InvalidSize));
            }
            other => panic!("expected section error, got {other:?}"),
        }
    }

    #[test]
    fn classification() {
        assert!(BlockError::NotFound("x".into()).is_not_found());
        assert!(!BlockError::NotFound("x".into()).is_corruption());
        assert!(BlockError::InvalidFlag(7).in_section(3).is_corruption());
        assert!(BlockError::InvalidMagic {
            expected: 1,
            found: 2
        }
        .is_corruption());
        assert!(!BlockError::Codec("boom".into()).is_corruption());
    }

    #[test]
    fn magic_error_reports_found_value() {
        let msg = BlockError::InvalidMagic {
            expected: 0xBAAA_D700,
            found: 0xDEAD_BEEF,
        }
        .to_string();
        assert!(msg.contains("0xdeadbeef"), "unexpected message: {msg}");
    }
}
