use std::io::Write;

use crate::error::WireError;
use crate::varint::encode_uvarint;

/// Primitive encoder, the mirror image of [`ProtoReader`](crate::ProtoReader).
///
/// The client never writes server packets in production; this exists so
/// that tests, benches and fuzz seeds can produce byte-exact server
/// responses without hand-assembling them.
#[derive(Debug)]
pub struct ProtoWriter<W> {
    inner: W,
}

macro_rules! write_le {
    ($($name:ident => $ty:ty),+ $(,)?) => {
        $(
            #[doc = concat!("Write a little-endian `", stringify!($ty), "`.")]
            pub fn $name(&mut self, value: $ty) -> Result<(), WireError> {
                self.inner.write_all(&value.to_le_bytes())?;
                Ok(())
            }
        )+
    };
}

impl<W: Write> ProtoWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), WireError> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        self.write_byte(u8::from(value))
    }

    pub fn write_uvarint(&mut self, value: u64) -> Result<(), WireError> {
        let (buf, len) = encode_uvarint(value);
        self.inner.write_all(&buf[..len])?;
        Ok(())
    }

    write_le! {
        write_u16 => u16,
        write_u32 => u32,
        write_u64 => u64,
        write_i8 => i8,
        write_i16 => i16,
        write_i32 => i32,
        write_i64 => i64,
        write_f32 => f32,
        write_f64 => f64,
    }

    /// Write raw bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write a uvarint-prefixed byte string.
    pub fn write_string(&mut self, value: impl AsRef<[u8]>) -> Result<(), WireError> {
        let bytes = value.as_ref();
        self.write_uvarint(bytes.len() as u64)?;
        self.write_raw(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::reader::ProtoReader;

    #[test]
    fn writes_read_back_in_order() {
        let mut w = ProtoWriter::new(Vec::new());
        w.write_byte(0x05).unwrap();
        w.write_uvarint(54460).unwrap();
        w.write_i32(-60).unwrap();
        w.write_string("SELECT 1").unwrap();
        w.write_bool(true).unwrap();
        w.write_f64(0.5).unwrap();

        let mut r = ProtoReader::new(Cursor::new(w.into_inner()));
        assert_eq!(r.read_byte().unwrap(), 0x05);
        assert_eq!(r.read_uvarint().unwrap(), 54460);
        assert_eq!(r.read_i32().unwrap(), -60);
        assert_eq!(r.read_string().unwrap(), "SELECT 1");
        assert!(r.read_bool().unwrap());
        assert!((r.read_f64().unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn string_layout() {
        let mut w = ProtoWriter::new(Vec::new());
        w.write_string("ab").unwrap();
        assert_eq!(w.into_inner(), vec![0x02, b'a', b'b']);
    }
}
