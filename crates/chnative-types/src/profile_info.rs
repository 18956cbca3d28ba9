use std::fmt;
use std::io::{Read, Write};

use chnative_wire::packet::revision;
use chnative_wire::{ProtoReader, ProtoWriter};

use crate::error::TypeError;

/// Query-level summary the server sends once, after the last data block.
///
/// The dispatcher only traces this; it has no handler of its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProfileInfo {
    pub rows: u64,
    pub blocks: u64,
    pub bytes: u64,
    pub applied_limit: bool,
    pub rows_before_limit: u64,
    pub calculated_rows_before_limit: bool,
    /// Revision 54469 and later.
    pub applied_aggregation: bool,
    /// Revision 54469 and later.
    pub rows_before_aggregation: u64,
}

impl ProfileInfo {
    pub fn decode<R: Read>(r: &mut ProtoReader<R>, revision: u64) -> Result<Self, TypeError> {
        let mut info = Self {
            rows: r.read_uvarint()?,
            blocks: r.read_uvarint()?,
            bytes: r.read_uvarint()?,
            applied_limit: r.read_bool()?,
            rows_before_limit: r.read_uvarint()?,
            calculated_rows_before_limit: r.read_bool()?,
            ..Self::default()
        };
        if revision >= revision::WITH_ROWS_BEFORE_AGGREGATION {
            info.applied_aggregation = r.read_bool()?;
            info.rows_before_aggregation = r.read_uvarint()?;
        }
        Ok(info)
    }

    pub fn encode<W: Write>(&self, w: &mut ProtoWriter<W>, revision: u64) -> Result<(), TypeError> {
        w.write_uvarint(self.rows)?;
        w.write_uvarint(self.blocks)?;
        w.write_uvarint(self.bytes)?;
        w.write_bool(self.applied_limit)?;
        w.write_uvarint(self.rows_before_limit)?;
        w.write_bool(self.calculated_rows_before_limit)?;
        if revision >= revision::WITH_ROWS_BEFORE_AGGREGATION {
            w.write_bool(self.applied_aggregation)?;
            w.write_uvarint(self.rows_before_aggregation)?;
        }
        Ok(())
    }
}

impl fmt::Display for ProfileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={}, bytes={}, blocks={}, rows before limit={}, applied limit={}, calculated rows before limit={}",
            self.rows,
            self.bytes,
            self.blocks,
            self.rows_before_limit,
            self.applied_limit,
            self.calculated_rows_before_limit
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn aggregation_fields_are_revision_gated() {
        let info = ProfileInfo {
            rows: 10,
            blocks: 1,
            bytes: 80,
            applied_limit: true,
            rows_before_limit: 100,
            calculated_rows_before_limit: true,
            applied_aggregation: true,
            rows_before_aggregation: 7,
        };

        for (rev, expected_len, keeps_aggregation) in [
            (revision::DEFAULT, 7, false),
            (revision::WITH_ROWS_BEFORE_AGGREGATION, 9, true),
        ] {
            let mut w = ProtoWriter::new(Vec::new());
            info.encode(&mut w, rev).unwrap();
            let bytes = w.into_inner();
            assert_eq!(bytes.len(), expected_len);

            let decoded = ProfileInfo::decode(&mut ProtoReader::new(Cursor::new(bytes)), rev).unwrap();
            assert_eq!(decoded.rows_before_limit, 100);
            assert_eq!(decoded.applied_aggregation, keeps_aggregation);
        }
    }
}
