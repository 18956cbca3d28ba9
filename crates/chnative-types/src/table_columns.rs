use std::io::{Read, Write};

use chnative_wire::{ProtoReader, ProtoWriter};

use crate::error::TypeError;

/// Column description of the table an `INSERT` targets, sent before the
/// server asks for data. Traced by the dispatcher, never routed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableColumns {
    pub table_name: String,
    /// Column list in the server's `ColumnsDescription` text format.
    pub description: String,
}

impl TableColumns {
    pub fn decode<R: Read>(r: &mut ProtoReader<R>) -> Result<Self, TypeError> {
        Ok(Self {
            table_name: r.read_string()?,
            description: r.read_string()?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut ProtoWriter<W>) -> Result<(), TypeError> {
        w.write_string(&self.table_name)?;
        w.write_string(&self.description)?;
        Ok(())
    }
}
