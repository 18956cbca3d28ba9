use std::io::{Cursor, Write};

use chnative_wire::frame::{CHECKSUM_SIZE, FRAME_HEADER_SIZE};
use chnative_wire::{CompressionMethod, FrameHeader, ProtoWriter};

use crate::error::EncodeError;

/// Uncompressed bytes per frame. The server flushes its compression
/// buffer at this size, so a large block spans several frames.
pub const DEFAULT_FRAME_SIZE: usize = 1024 * 1024;

/// zstd level the server uses unless configured otherwise.
const DEFAULT_COMPRESSION_LEVEL: i32 = 1;

/// Compress a byte slice with zstd.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    Ok(zstd::encode_all(Cursor::new(data), DEFAULT_COMPRESSION_LEVEL)?)
}

/// Wrap `data` in compressed frames of at most `frame_size` uncompressed
/// bytes each.
///
/// The checksum field is left zeroed. `frame_size` of zero is treated as
/// one frame for the whole input.
///
/// # Errors
///
/// - [`EncodeError::UnsupportedCompression`] for LZ4.
/// - [`EncodeError::FrameTooLarge`] if a frame does not fit the `u32`
///   size fields.
pub fn write_frames<W: Write>(
    w: &mut ProtoWriter<W>,
    method: CompressionMethod,
    data: &[u8],
    frame_size: usize,
) -> Result<(), EncodeError> {
    let frame_size = if frame_size == 0 { data.len().max(1) } else { frame_size };
    for chunk in data.chunks(frame_size) {
        write_frame(w, method, chunk)?;
    }
    Ok(())
}

fn write_frame<W: Write>(
    w: &mut ProtoWriter<W>,
    method: CompressionMethod,
    chunk: &[u8],
) -> Result<(), EncodeError> {
    let payload = match method {
        CompressionMethod::None => chunk.to_vec(),
        CompressionMethod::Zstd => compress(chunk)?,
        CompressionMethod::Lz4 => return Err(EncodeError::UnsupportedCompression(method)),
    };

    let limit = (u32::MAX - FRAME_HEADER_SIZE) as usize;
    let too_large = |size: usize| EncodeError::FrameTooLarge { size, limit };
    let compressed_size = u32::try_from(payload.len())
        .ok()
        .and_then(|n| n.checked_add(FRAME_HEADER_SIZE))
        .ok_or_else(|| too_large(payload.len()))?;
    let decompressed_size = u32::try_from(chunk.len()).map_err(|_| too_large(chunk.len()))?;

    FrameHeader {
        checksum: [0; CHECKSUM_SIZE],
        method,
        compressed_size,
        decompressed_size,
    }
    .write_to(w)?;
    w.write_raw(&payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(method: CompressionMethod, data: &[u8], frame_size: usize) -> Vec<u8> {
        let mut w = ProtoWriter::new(Vec::new());
        write_frames(&mut w, method, data, frame_size).unwrap();
        w.into_inner()
    }

    #[test]
    fn uncompressed_frame_layout() {
        let bytes = frames(CompressionMethod::None, b"abc", 0);
        assert_eq!(bytes.len(), CHECKSUM_SIZE + 9 + 3);
        assert_eq!(bytes[CHECKSUM_SIZE], 0x02);
        assert_eq!(&bytes[CHECKSUM_SIZE + 1..CHECKSUM_SIZE + 5], &12u32.to_le_bytes());
        assert_eq!(&bytes[CHECKSUM_SIZE + 5..CHECKSUM_SIZE + 9], &3u32.to_le_bytes());
        assert_eq!(&bytes[CHECKSUM_SIZE + 9..], b"abc");
    }

    #[test]
    fn zstd_shrinks_repetitive_blocks() {
        let data = "SelectedRows".repeat(500);
        let bytes = frames(CompressionMethod::Zstd, data.as_bytes(), 0);
        assert_eq!(bytes[CHECKSUM_SIZE], 0x90);
        assert!(bytes.len() < data.len());
    }

    #[test]
    fn splits_into_frames() {
        let bytes = frames(CompressionMethod::None, &[7; 10], 4);
        // 4 + 4 + 2 payload bytes, three headers
        assert_eq!(bytes.len(), 3 * (CHECKSUM_SIZE + 9) + 10);
    }

    #[test]
    fn lz4_is_refused() {
        let mut w = ProtoWriter::new(Vec::new());
        assert!(matches!(
            write_frames(&mut w, CompressionMethod::Lz4, b"x", 0),
            Err(EncodeError::UnsupportedCompression(CompressionMethod::Lz4))
        ));
    }
}
