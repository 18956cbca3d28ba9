/// Errors raised by the primitive readers and writers.
///
/// These sit at the bottom of the error stack: every payload decoder in
/// `chnative-types` reads through [`ProtoReader`](crate::ProtoReader), so
/// anything that goes wrong while pulling bytes off the connection
/// surfaces here first and is wrapped by the layers above.
///
/// ```text
/// ┌────────────────────────────┬──────────────────────────────────────────┐
/// │ Variant                    │ Cause                                    │
/// ├────────────────────────────┼──────────────────────────────────────────┤
/// │ VarintTooLong              │ 10 bytes read, continuation bit still on │
/// │ UnexpectedEof              │ slice decode ran past the end            │
/// │ UnknownCompressionMethod   │ compressed frame method byte unknown     │
/// │ FrameSize                  │ compressed frame size field inconsistent │
/// │ Io                         │ underlying transport read/write failure  │
/// └────────────────────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Varint encoding exceeded 10 bytes without terminating.
    #[error("varint too long: exceeded 10-byte limit")]
    VarintTooLong,

    /// A slice ended before a complete varint could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// The method byte of a compressed frame is not one the server emits.
    #[error("unknown compression method {method:#04X}")]
    UnknownCompressionMethod { method: u8 },

    /// The `compressed_size` field of a frame header is smaller than the
    /// header itself.
    #[error("compressed frame size {size} is smaller than its {header}-byte header")]
    FrameSize { size: u32, header: u32 },

    /// I/O error during read or write.
    ///
    /// A clean close of the connection shows up here as
    /// [`std::io::ErrorKind::UnexpectedEof`].
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Extract the underlying transport error, if that is what this is.
    ///
    /// The dispatcher uses this to surface transport failures unchanged
    /// instead of reporting them as malformed payloads.
    pub fn into_io(self) -> Result<std::io::Error, Self> {
        match self {
            Self::Io(err) => Ok(err),
            other => Err(other),
        }
    }
}
