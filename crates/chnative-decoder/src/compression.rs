use std::io::{self, Read};

use chnative_wire::{CompressionMethod, FrameHeader, ProtoReader, WireError};

use crate::error::CompressionError;

/// Presents a run of compressed frames as a plain byte stream.
///
/// A block decoder reads through this exactly as it would read the raw
/// connection; frames are pulled from the underlying reader one at a
/// time, only when the previous one is used up. A block always ends on
/// a frame boundary, so nothing beyond the block is consumed.
///
/// ```text
///   ProtoReader<R> ──▶ [frame][frame][frame] ──▶ CompressedReader ──▶ Block::decode
///                       header + payload          decompressed bytes
/// ```
///
/// Errors inside the envelope are reported as `io::Error` wrapping a
/// [`CompressionError`], because that is all `Read` can return; the
/// dispatcher unwraps them again.
pub struct CompressedReader<'a, R> {
    inner: &'a mut ProtoReader<R>,
    buf: Vec<u8>,
    pos: usize,
    max_block_size: usize,
}

impl<'a, R: Read> CompressedReader<'a, R> {
    pub fn new(inner: &'a mut ProtoReader<R>, max_block_size: usize) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
            max_block_size,
        }
    }

    /// Bytes of the current frame not yet handed out.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn next_frame(&mut self) -> io::Result<()> {
        let header = FrameHeader::read_from(self.inner).map_err(envelope_error)?;

        let declared = header.decompressed_size as usize;
        if declared > self.max_block_size {
            return Err(CompressionError::DecompressionBomb {
                actual: declared,
                limit: self.max_block_size,
            }
            .into());
        }

        let payload = self
            .inner
            .read_bytes(u64::from(header.payload_len()))
            .map_err(envelope_error)?;

        self.buf = match header.method {
            CompressionMethod::None => payload,
            CompressionMethod::Zstd => zstd::bulk::decompress(&payload, declared)
                .map_err(|e| CompressionError::DecompressFailed(e.to_string()))?,
            method @ CompressionMethod::Lz4 => {
                return Err(CompressionError::UnsupportedMethod(method).into());
            }
        };
        self.pos = 0;

        if self.buf.len() != declared {
            return Err(CompressionError::SizeMismatch {
                declared,
                actual: self.buf.len(),
            }
            .into());
        }
        Ok(())
    }
}

/// Transport failures pass through; anything else is a bad envelope.
fn envelope_error(err: WireError) -> io::Error {
    match err.into_io() {
        Ok(io) => io,
        Err(other) => CompressionError::Frame(other).into(),
    }
}

impl<R: Read> Read for CompressedReader<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.remaining() == 0 {
            self.next_frame()?;
        }
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chnative_wire::ProtoWriter;
    use chnative_wire::frame::CHECKSUM_SIZE;

    use super::*;

    fn frame(method: u8, payload: &[u8], decompressed_size: u32) -> Vec<u8> {
        let mut w = ProtoWriter::new(Vec::new());
        w.write_raw(&[0; CHECKSUM_SIZE]).unwrap();
        w.write_byte(method).unwrap();
        w.write_u32(9 + u32::try_from(payload.len()).unwrap()).unwrap();
        w.write_u32(decompressed_size).unwrap();
        w.write_raw(payload).unwrap();
        w.into_inner()
    }

    fn read_all(bytes: Vec<u8>, limit: usize, len: usize) -> io::Result<Vec<u8>> {
        let mut outer = ProtoReader::new(Cursor::new(bytes));
        let mut reader = CompressedReader::new(&mut outer, limit);
        let mut out = vec![0; len];
        reader.read_exact(&mut out)?;
        Ok(out)
    }

    fn compression_error(err: &io::Error) -> &CompressionError {
        err.get_ref()
            .and_then(|e| e.downcast_ref::<CompressionError>())
            .expect("a compression error")
    }

    #[test]
    fn reads_across_frame_boundaries() {
        let mut bytes = frame(0x02, b"hello ", 6);
        let compressed = zstd::bulk::compress(b"world", 1).unwrap();
        bytes.extend(frame(0x90, &compressed, 5));
        bytes.push(0xEE); // next packet, must stay unread

        let mut outer = ProtoReader::new(Cursor::new(bytes));
        let mut out = [0; 11];
        CompressedReader::new(&mut outer, 1024).read_exact(&mut out).unwrap();
        assert_eq!(&out, b"hello world");
        assert_eq!(outer.read_byte().unwrap(), 0xEE);
    }

    #[test]
    fn oversized_frame_rejected_before_reading_payload() {
        let err = read_all(frame(0x02, b"abcd", 4), 3, 4).unwrap_err();
        assert!(matches!(
            compression_error(&err),
            CompressionError::DecompressionBomb { actual: 4, limit: 3 }
        ));
    }

    #[test]
    fn lz4_rejected() {
        let err = read_all(frame(0x82, b"xx", 2), 1024, 2).unwrap_err();
        assert!(matches!(
            compression_error(&err),
            CompressionError::UnsupportedMethod(CompressionMethod::Lz4)
        ));
    }

    #[test]
    fn unknown_method_rejected() {
        let err = read_all(frame(0x42, b"xx", 2), 1024, 2).unwrap_err();
        assert!(matches!(compression_error(&err), CompressionError::Frame(_)));
    }

    #[test]
    fn declared_size_must_match() {
        let err = read_all(frame(0x02, b"abc", 5), 1024, 3).unwrap_err();
        assert!(matches!(
            compression_error(&err),
            CompressionError::SizeMismatch { declared: 5, actual: 3 }
        ));
    }

    #[test]
    fn corrupt_zstd_payload() {
        let err = read_all(frame(0x90, b"not zstd", 8), 1024, 8).unwrap_err();
        assert!(matches!(compression_error(&err), CompressionError::DecompressFailed(_)));
    }

    #[test]
    fn truncated_frame_is_plain_eof() {
        let mut bytes = frame(0x02, b"abcdef", 6);
        bytes.truncate(bytes.len() - 2);
        let err = read_all(bytes, 1024, 6).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.get_ref().is_none_or(|e| !e.is::<CompressionError>()));
    }
}
