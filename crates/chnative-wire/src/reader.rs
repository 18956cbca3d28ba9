use std::io::{self, Read};

use crate::error::WireError;
use crate::varint::read_uvarint;

/// Primitive decoder over a byte stream.
///
/// Every multi-byte integer on the native protocol is little-endian and
/// fixed width; lengths and counters are uvarints; strings are a uvarint
/// length followed by raw bytes. `ProtoReader` exposes exactly those
/// shapes and nothing else. It performs no buffering of its own, so it
/// never consumes a byte belonging to the next packet.
///
/// The reader counts the bytes it has consumed. The count is only used
/// for diagnostics (the CLI prints packet offsets).
///
/// ```text
/// ┌──────────────┬────────────────────────────────────┐
/// │ Method       │ Wire shape                         │
/// ├──────────────┼────────────────────────────────────┤
/// │ read_byte    │ 1 byte                             │
/// │ read_bool    │ 1 byte, non-zero = true            │
/// │ read_uvarint │ LEB128, 1–10 bytes                 │
/// │ read_u32 …   │ fixed width, little-endian         │
/// │ read_string  │ uvarint length + bytes (lossy UTF-8)│
/// └──────────────┴────────────────────────────────────┘
/// ```
#[derive(Debug)]
pub struct ProtoReader<R> {
    inner: R,
    offset: u64,
}

macro_rules! read_le {
    ($($name:ident => $ty:ty),+ $(,)?) => {
        $(
            #[doc = concat!("Read a little-endian `", stringify!($ty), "`.")]
            pub fn $name(&mut self) -> Result<$ty, WireError> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                self.read_exact(&mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }
        )+
    };
}

impl<R: Read> ProtoReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read a single byte. This is how every packet discriminator is read.
    pub fn read_byte(&mut self) -> Result<u8, WireError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_uvarint(&mut self) -> Result<u64, WireError> {
        read_uvarint(self)
    }

    read_le! {
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_i8 => i8,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }

    /// Read a fixed-size array, e.g. the 16-byte checksum of a
    /// compressed frame.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read exactly `len` bytes.
    ///
    /// The buffer grows as bytes arrive rather than being allocated up
    /// front, so a corrupt length prefix cannot force a huge allocation
    /// before the stream runs dry.
    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::new();
        let read = self.by_ref().take(len).read_to_end(&mut buf)?;
        if (read as u64) < len {
            return Err(WireError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, stream ended after {read}"),
            )));
        }
        Ok(buf)
    }

    /// Read a uvarint-prefixed byte string.
    pub fn read_string_bytes(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.read_uvarint()?;
        self.read_bytes(len)
    }

    /// Read a uvarint-prefixed string. Invalid UTF-8 is replaced rather
    /// than rejected; the server does not guarantee valid UTF-8 in
    /// `String` columns.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let bytes = self.read_string_bytes()?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

impl<R: Read> Read for ProtoReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn reader(bytes: &[u8]) -> ProtoReader<Cursor<Vec<u8>>> {
        ProtoReader::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn fixed_width_is_little_endian() {
        let mut r = reader(&[0x01, 0x00, 0x00, 0x00, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(r.read_u32().unwrap(), 1);
        assert_eq!(r.read_i32().unwrap(), -2);
        assert_eq!(r.offset(), 8);
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut r = reader(&[0x05, b'h', b'e', b'l', b'l', b'o', 0x00]);
        assert_eq!(r.read_string().unwrap(), "hello");
        assert_eq!(r.read_string().unwrap(), "");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut r = reader(&[0x02, 0xFF, b'a']);
        assert_eq!(r.read_string().unwrap(), "\u{FFFD}a");
    }

    #[test]
    fn short_string_is_eof() {
        let mut r = reader(&[0x0A, b'x']);
        match r.read_string() {
            Err(WireError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {other:?}"),
        }
    }

    #[test]
    fn huge_length_prefix_does_not_preallocate() {
        // Claims ~2^63 bytes; must fail with EOF, not abort on allocation.
        let mut bytes = vec![0xFF; 9];
        bytes.push(0x7F);
        let mut r = reader(&bytes);
        assert!(matches!(r.read_string(), Err(WireError::Io(_))));
    }

    #[test]
    fn bool_is_any_non_zero_byte() {
        let mut r = reader(&[0x00, 0x01, 0x02]);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn empty_stream_read_byte_is_eof() {
        let mut r = reader(&[]);
        match r.read_byte() {
            Err(WireError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {other:?}"),
        }
    }
}
