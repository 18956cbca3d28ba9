use std::io::Read;

use crate::error::WireError;

/// Maximum number of bytes a u64 uvarint can occupy: ceil(64 / 7).
pub const MAX_UVARINT_LEN: usize = 10;

/// Encode `value` as an unsigned LEB128 varint.
///
/// The native protocol uses this for every length prefix (strings, column
/// counts, row counts) and for most progress counters. Returns the
/// scratch buffer and the number of bytes used.
///
/// | Value   | Encoded bytes        |
/// |---------|----------------------|
/// | 0       | `[0x00]`             |
/// | 127     | `[0x7F]`             |
/// | 128     | `[0x80, 0x01]`       |
/// | 54460   | `[0xBC, 0xA9, 0x03]` |
pub fn encode_uvarint(value: u64) -> ([u8; MAX_UVARINT_LEN], usize) {
    let mut buf = [0u8; MAX_UVARINT_LEN];
    let mut rest = value;
    let mut len = 0;
    for slot in &mut buf {
        #[allow(clippy::cast_possible_truncation)]
        let low = (rest & 0x7F) as u8;
        rest >>= 7;
        len += 1;
        if rest == 0 {
            *slot = low;
            break;
        }
        *slot = low | 0x80;
    }
    (buf, len)
}

/// Decode an unsigned LEB128 varint from the front of a slice.
///
/// Returns `(value, bytes_consumed)`.
///
/// # Errors
///
/// - [`WireError::VarintTooLong`] if ten bytes pass without a terminator.
/// - [`WireError::UnexpectedEof`] if the slice ends mid-varint.
pub fn decode_uvarint(buf: &[u8]) -> Result<(u64, usize), WireError> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_UVARINT_LEN {
            return Err(WireError::VarintTooLong);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(WireError::UnexpectedEof { offset: buf.len() })
}

/// Read an unsigned LEB128 varint one byte at a time from a stream.
///
/// The connection is unbuffered from the protocol's point of view, so
/// this never reads past the terminating byte.
///
/// # Errors
///
/// - [`WireError::VarintTooLong`] on an over-long encoding.
/// - [`WireError::Io`] if the stream fails or closes mid-varint.
pub fn read_uvarint(reader: &mut impl Read) -> Result<u64, WireError> {
    let mut value: u64 = 0;
    for i in 0..MAX_UVARINT_LEN {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        value |= u64::from(byte[0] & 0x7F) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(WireError::VarintTooLong)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let (buf, len) = encode_uvarint(value);
        buf[..len].to_vec()
    }

    #[test]
    fn single_byte_values() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(127), vec![0x7F]);
    }

    #[test]
    fn multi_byte_values() {
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        // The default client revision.
        assert_eq!(encode(54460), vec![0xBC, 0xA9, 0x03]);
    }

    #[test]
    fn u64_max_takes_ten_bytes() {
        assert_eq!(encode(u64::MAX).len(), MAX_UVARINT_LEN);
    }

    #[test]
    fn slice_and_stream_decoders_agree() {
        for value in [0, 1, 127, 128, 16_383, 16_384, u64::from(u32::MAX), u64::MAX] {
            let bytes = encode(value);
            let (decoded, consumed) = decode_uvarint(&bytes).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, bytes.len());

            let mut cursor = std::io::Cursor::new(&bytes);
            assert_eq!(read_uvarint(&mut cursor).unwrap(), value);
            assert_eq!(cursor.position() as usize, bytes.len());
        }
    }

    #[test]
    fn stream_read_stops_at_terminator() {
        let mut cursor = std::io::Cursor::new(vec![0xAC, 0x02, 0xFF, 0xFF]);
        assert_eq!(read_uvarint(&mut cursor).unwrap(), 300);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn truncated_slice() {
        assert!(matches!(
            decode_uvarint(&[0x80]),
            Err(WireError::UnexpectedEof { offset: 1 })
        ));
        assert!(matches!(
            decode_uvarint(&[]),
            Err(WireError::UnexpectedEof { offset: 0 })
        ));
    }

    #[test]
    fn truncated_stream_is_io_error() {
        let mut cursor = std::io::Cursor::new(vec![0x80, 0x80]);
        match read_uvarint(&mut cursor) {
            Err(WireError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io(UnexpectedEof), got {other:?}"),
        }
    }

    #[test]
    fn over_long_encoding_rejected() {
        let buf = [0x80; 11];
        assert!(matches!(decode_uvarint(&buf), Err(WireError::VarintTooLong)));
        let mut cursor = std::io::Cursor::new(buf.to_vec());
        assert!(matches!(read_uvarint(&mut cursor), Err(WireError::VarintTooLong)));
    }
}
