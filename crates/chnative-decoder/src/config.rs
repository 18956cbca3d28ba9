use chnative_wire::packet::revision;

/// Default cap on the decompressed size of one compressed frame (256 MiB).
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 256 * 1024 * 1024;

/// Connection parameters the dispatcher needs to decode payloads.
///
/// These are fixed by the handshake, which happens elsewhere; the
/// dispatcher only consumes them.
///
/// ```text
/// ┌────────────────┬────────────────────────────────────────────────────┐
/// │ Field          │ Purpose                                            │
/// ├────────────────┼────────────────────────────────────────────────────┤
/// │ revision       │ Negotiated protocol revision; gates payload fields │
/// │ compression    │ Data/Totals/Extremes blocks arrive in frames       │
/// │ max_block_size │ Upper bound on one frame's decompressed size       │
/// └────────────────┴────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    pub revision: u64,

    /// Whether compression was negotiated. Log and ProfileEvents blocks
    /// are read uncompressed regardless.
    pub compression: bool,

    /// Frames declaring a larger decompressed size are rejected before
    /// any allocation.
    pub max_block_size: usize,
}

impl Default for DecoderConfig {
    /// The current client revision, no compression, 256 MiB frames.
    fn default() -> Self {
        Self {
            revision: revision::DEFAULT,
            compression: false,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
        }
    }
}

impl DecoderConfig {
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }
}
