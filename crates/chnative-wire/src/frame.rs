use std::io::{Read, Write};

use crate::error::WireError;
use crate::reader::ProtoReader;
use crate::writer::ProtoWriter;

/// Size of the checksum that precedes every compressed frame.
pub const CHECKSUM_SIZE: usize = 16;

/// Bytes covered by `compressed_size` that are not payload:
/// method (1) + compressed_size (4) + decompressed_size (4).
pub const FRAME_HEADER_SIZE: u32 = 9;

/// Compression method byte of a frame.
///
/// ```text
/// ┌──────┬────────┐
/// │ Wire │ Method │
/// ├──────┼────────┤
/// │ 0x02 │ None   │
/// │ 0x82 │ Lz4    │
/// │ 0x90 │ Zstd   │
/// └──────┴────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    None,
    Lz4,
    Zstd,
}

impl CompressionMethod {
    pub fn wire_id(self) -> u8 {
        match self {
            Self::None => 0x02,
            Self::Lz4 => 0x82,
            Self::Zstd => 0x90,
        }
    }

    pub fn from_wire_id(id: u8) -> Result<Self, WireError> {
        match id {
            0x02 => Ok(Self::None),
            0x82 => Ok(Self::Lz4),
            0x90 => Ok(Self::Zstd),
            method => Err(WireError::UnknownCompressionMethod { method }),
        }
    }
}

/// Header of one compressed frame.
///
/// When compression is negotiated, the bytes of a Data/Totals/Extremes
/// block travel as a sequence of these frames. A block may span several
/// frames and a frame never spans two packets.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │ checksum           [16 bytes]                            │
/// │ method             (u8)                                  │
/// │ compressed_size    (u32 LE, includes the 9 header bytes) │
/// │ decompressed_size  (u32 LE)                              │
/// │ payload            [compressed_size - 9 bytes]           │
/// └──────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// CityHash128 of everything after the checksum. Carried through but
    /// not verified.
    pub checksum: [u8; CHECKSUM_SIZE],
    pub method: CompressionMethod,
    pub compressed_size: u32,
    pub decompressed_size: u32,
}

impl FrameHeader {
    /// Read a frame header, leaving the reader positioned at the payload.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnknownCompressionMethod`] for an unrecognized method.
    /// - [`WireError::FrameSize`] if `compressed_size` cannot even cover
    ///   the header.
    /// - [`WireError::Io`] if the stream fails.
    pub fn read_from<R: Read>(r: &mut ProtoReader<R>) -> Result<Self, WireError> {
        let checksum = r.read_array::<CHECKSUM_SIZE>()?;
        let method = CompressionMethod::from_wire_id(r.read_byte()?)?;
        let compressed_size = r.read_u32()?;
        if compressed_size < FRAME_HEADER_SIZE {
            return Err(WireError::FrameSize {
                size: compressed_size,
                header: FRAME_HEADER_SIZE,
            });
        }
        let decompressed_size = r.read_u32()?;
        Ok(Self {
            checksum,
            method,
            compressed_size,
            decompressed_size,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut ProtoWriter<W>) -> Result<(), WireError> {
        w.write_raw(&self.checksum)?;
        w.write_byte(self.method.wire_id())?;
        w.write_u32(self.compressed_size)?;
        w.write_u32(self.decompressed_size)
    }

    /// Number of payload bytes following the header.
    pub fn payload_len(&self) -> u32 {
        self.compressed_size - FRAME_HEADER_SIZE
    }
}
