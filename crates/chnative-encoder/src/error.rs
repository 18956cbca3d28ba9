use chnative_types::TypeError;
use chnative_wire::{CompressionMethod, WireError};

/// Errors that can occur while encoding a server response.
///
/// ```text
///   EncodeError
///   ├── UnsupportedCompression ← frame method this encoder cannot produce
///   ├── FrameTooLarge          ← frame payload does not fit a u32 size
///   ├── Type(TypeError)        ← from chnative-types payload encoding
///   ├── Wire(WireError)        ← from chnative-wire primitives
///   └── Io(std::io::Error)     ← from zstd or the output buffer
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("cannot encode {0:?} frames")]
    UnsupportedCompression(CompressionMethod),

    #[error("frame payload exceeds maximum size ({size} bytes, limit {limit})")]
    FrameTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
