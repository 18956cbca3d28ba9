use std::io::{Read, Write};

use chnative_wire::{ProtoReader, ProtoWriter};

use crate::error::TypeError;

/// An error the server raised while executing a query.
///
/// A well-formed Exception packet is a *successful* decode: it ends the
/// response with the server's verdict. Nested exceptions (the server's
/// "caused by" chain) are linked through [`nested`](Self::nested) and
/// exposed as the error's `source()`.
///
/// ```text
/// ┌─────────────┬─────────┐
/// │ code        │ i32 LE  │
/// │ name        │ string  │
/// │ message     │ string  │
/// │ stack_trace │ string  │
/// │ has_nested  │ bool    │──┐ if set, another exception follows
/// └─────────────┴─────────┘  │
///           ┌────────────────┘
///           ▼
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("code: {code}, message: {message}")]
pub struct ServerException {
    pub code: i32,
    /// Exception class name, e.g. `DB::Exception`.
    pub name: String,
    pub message: String,
    pub stack_trace: String,
    #[source]
    pub nested: Option<Box<ServerException>>,
}

impl ServerException {
    pub fn new(code: i32, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            message: message.into(),
            stack_trace: String::new(),
            nested: None,
        }
    }

    #[must_use]
    pub fn with_nested(mut self, nested: ServerException) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    /// This exception followed by every nested one, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &ServerException> {
        std::iter::successors(Some(self), |e| e.nested.as_deref())
    }

    /// Read an exception and its whole nested chain.
    ///
    /// The chain is read into a flat list first and linked afterwards, so
    /// a hostile server cannot drive recursion depth.
    pub fn decode<R: Read>(r: &mut ProtoReader<R>) -> Result<Self, TypeError> {
        let (mut outer, mut has_nested) = Self::decode_one(r)?;
        let mut rest = Vec::new();
        while has_nested {
            let (e, more) = Self::decode_one(r)?;
            rest.push(e);
            has_nested = more;
        }

        outer.nested = rest
            .into_iter()
            .rev()
            .fold(None, |inner, mut e: Self| {
                e.nested = inner;
                Some(Box::new(e))
            });
        Ok(outer)
    }

    fn decode_one<R: Read>(r: &mut ProtoReader<R>) -> Result<(Self, bool), TypeError> {
        let e = Self {
            code: r.read_i32()?,
            name: r.read_string()?,
            message: r.read_string()?,
            stack_trace: r.read_string()?,
            nested: None,
        };
        Ok((e, r.read_bool()?))
    }

    pub fn encode<W: Write>(&self, w: &mut ProtoWriter<W>) -> Result<(), TypeError> {
        for e in self.chain() {
            w.write_i32(e.code)?;
            w.write_string(&e.name)?;
            w.write_string(&e.message)?;
            w.write_string(&e.stack_trace)?;
            w.write_bool(e.nested.is_some())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io::Cursor;

    use super::*;

    fn decode(bytes: Vec<u8>) -> Result<ServerException, TypeError> {
        ServerException::decode(&mut ProtoReader::new(Cursor::new(bytes)))
    }

    #[test]
    fn single_exception_layout() {
        let mut w = ProtoWriter::new(Vec::new());
        w.write_i32(60).unwrap();
        w.write_string("DB::Exception").unwrap();
        w.write_string("Table default.t doesn't exist").unwrap();
        w.write_string("").unwrap();
        w.write_bool(false).unwrap();

        let e = decode(w.into_inner()).unwrap();
        assert_eq!(e.code, 60);
        assert_eq!(e.name, "DB::Exception");
        assert!(e.nested.is_none());
        assert_eq!(e.to_string(), "code: 60, message: Table default.t doesn't exist");
    }

    #[test]
    fn nested_chain_is_linked_in_order() {
        let e = ServerException::new(1000, "DB::Exception", "outer")
            .with_nested(ServerException::new(210, "DB::NetException", "middle")
                .with_nested(ServerException::new(32, "DB::Exception", "inner")));

        let mut w = ProtoWriter::new(Vec::new());
        e.encode(&mut w).unwrap();
        let decoded = decode(w.into_inner()).unwrap();

        assert_eq!(decoded, e);
        let codes: Vec<i32> = decoded.chain().map(|e| e.code).collect();
        assert_eq!(codes, vec![1000, 210, 32]);
        assert_eq!(
            decoded.source().map(ToString::to_string).as_deref(),
            Some("code: 210, message: middle")
        );
    }

    #[test]
    fn truncated_chain_is_an_error() {
        let mut w = ProtoWriter::new(Vec::new());
        ServerException::new(1, "X", "y").encode(&mut w).unwrap();
        let mut bytes = w.into_inner();
        // Claim a nested exception that never arrives.
        *bytes.last_mut().unwrap() = 1;
        assert!(decode(bytes).is_err());
    }
}
