use std::io::{Read, Write};

use chnative_wire::packet::revision;
use chnative_wire::{ProtoReader, ProtoWriter};

use crate::column::{Column, ColumnData, ColumnType};
use crate::error::TypeError;

/// Per-block metadata written ahead of the columns.
///
/// On the wire this is a list of field-numbered values terminated by
/// field `0`, which lets newer servers append fields:
///
/// ```text
///   1 (uvarint) │ is_overflows (bool)
///   2 (uvarint) │ bucket_num   (i32 LE)
///   0 (uvarint)   ← end of block info
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Set on the overflow row of `GROUP BY ... WITH TOTALS` under
  /// `max_rows_to_group_by`.
  pub is_overflows: bool,
  /// Two-level aggregation bucket, `-1` when not applicable.
  pub bucket_num: i32,
}

impl Default for BlockInfo {
  fn default() -> Self {
    Self {
      is_overflows: false,
      bucket_num: -1,
    }
  }
}

impl BlockInfo {
  pub fn decode<R: Read>(r: &mut ProtoReader<R>) -> Result<Self, TypeError> {
    let mut info = Self::default();
    loop {
      match r.read_uvarint()? {
        0 => return Ok(info),
        1 => info.is_overflows = r.read_bool()?,
        2 => info.bucket_num = r.read_i32()?,
        field => return Err(TypeError::UnknownBlockInfoField { field }),
      }
    }
  }

  pub fn encode<W: Write>(&self, w: &mut ProtoWriter<W>) -> Result<(), TypeError> {
    w.write_uvarint(1)?;
    w.write_bool(self.is_overflows)?;
    w.write_uvarint(2)?;
    w.write_i32(self.bucket_num)?;
    w.write_uvarint(0)?;
    Ok(())
  }
}

/// A columnar chunk of query results.
///
/// Data, Totals and Extremes packets all carry one of these; so do Log
/// and ProfileEvents packets, whose blocks are then reinterpreted as
/// rows of [`LogEntry`](crate::LogEntry) or
/// [`ProfileEvent`](crate::ProfileEvent).
///
/// Wire layout (after the packet's table-name prefix):
///
/// ```text
/// ┌────────────────────────────────────────────────────────────┐
/// │ block info      (revision ≥ 51903)                         │
/// │ num_columns     (uvarint)                                  │
/// │ num_rows        (uvarint)                                  │
/// │ per column:                                                │
/// │   name          (string)                                   │
/// │   type          (string)                                   │
/// │   has_custom    (u8, revision ≥ 54454, must be 0)          │
/// │   data          (num_rows values; absent when num_rows=0)  │
/// └────────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
  pub info: BlockInfo,
  pub columns: Vec<Column>,
  pub num_rows: usize,
}

impl Block {
  /// Build a block from columns of equal length.
  ///
  /// # Errors
  ///
  /// [`TypeError::RowCountMismatch`] if the columns disagree.
  pub fn from_columns(columns: Vec<Column>) -> Result<Self, TypeError> {
    let num_rows = columns.first().map_or(0, Column::len);
    if let Some(bad) = columns.iter().find(|c| c.len() != num_rows) {
      return Err(TypeError::RowCountMismatch {
        column: bad.name.clone(),
        expected: num_rows,
        found: bad.len(),
      });
    }
    Ok(Self {
      info: BlockInfo::default(),
      columns,
      num_rows,
    })
  }

  pub fn num_columns(&self) -> usize {
    self.columns.len()
  }

  /// An empty block (no columns, no rows). The server sends one of these
  /// as the header of every SELECT result.
  pub fn is_empty(&self) -> bool {
    self.columns.is_empty() && self.num_rows == 0
  }

  pub fn column(&self, name: &str) -> Option<&Column> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn decode<R: Read>(r: &mut ProtoReader<R>, revision: u64) -> Result<Self, TypeError> {
    let info = if revision >= revision::WITH_BLOCK_INFO {
      BlockInfo::decode(r)?
    } else {
      BlockInfo::default()
    };

    let num_columns = r.read_uvarint()?;
    let num_rows = r.read_uvarint()?;
    let num_rows = usize::try_from(num_rows).map_err(|_| TypeError::TooLarge {
      what: "row count",
      value: num_rows,
    })?;

    let columns = (0..num_columns)
      .map(|_| Self::decode_column(r, revision, num_rows))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      info,
      columns,
      num_rows,
    })
  }

  fn decode_column<R: Read>(
    r: &mut ProtoReader<R>,
    revision: u64,
    num_rows: usize,
  ) -> Result<Column, TypeError> {
    let name = r.read_string()?;
    let type_name = r.read_string()?;

    if revision >= revision::WITH_CUSTOM_SERIALIZATION && r.read_byte()? != 0 {
      return Err(TypeError::CustomSerialization { column: name });
    }

    let ty = ColumnType::parse(&type_name)?;
    let data = if num_rows == 0 {
      ColumnData::empty(&ty)
    } else {
      ColumnData::decode(&ty, r, num_rows)?
    };

    Ok(Column {
      name,
      type_name,
      data,
    })
  }

  pub fn encode<W: Write>(&self, w: &mut ProtoWriter<W>, revision: u64) -> Result<(), TypeError> {
    if revision >= revision::WITH_BLOCK_INFO {
      self.info.encode(w)?;
    }
    w.write_uvarint(self.columns.len() as u64)?;
    w.write_uvarint(self.num_rows as u64)?;
    for column in &self.columns {
      w.write_string(&column.name)?;
      w.write_string(&column.type_name)?;
      if revision >= revision::WITH_CUSTOM_SERIALIZATION {
        w.write_byte(0)?;
      }
      if self.num_rows > 0 {
        column.data.encode(&column.column_type()?, w)?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  const REVISION: u64 = revision::DEFAULT;

  fn sample() -> Block {
    Block::from_columns(vec![
      Column::new("id", "UInt64", ColumnData::UInt64(vec![1, 2, 3])).unwrap(),
      Column::new(
        "name",
        "String",
        ColumnData::String(vec!["a".into(), "b".into(), "c".into()]),
      )
      .unwrap(),
    ])
    .unwrap()
  }

  fn reencode(block: &Block, revision: u64) -> (Block, usize) {
    let mut w = ProtoWriter::new(Vec::new());
    block.encode(&mut w, revision).unwrap();
    let bytes = w.into_inner();
    let len = bytes.len();
    let mut r = ProtoReader::new(Cursor::new(bytes));
    let decoded = Block::decode(&mut r, revision).unwrap();
    assert_eq!(r.offset() as usize, len, "decoder must consume the whole block");
    (decoded, len)
  }

  #[test]
  fn block_survives_the_wire() {
    let block = sample();
    let (decoded, _) = reencode(&block, REVISION);
    assert_eq!(decoded, block);
    assert_eq!(decoded.column("name").unwrap().len(), 3);
  }

  #[test]
  fn old_revisions_omit_info_and_custom_byte() {
    let block = sample();
    let (_, new_len) = reencode(&block, REVISION);
    let (decoded, old_len) = reencode(&block, revision::WITH_TEMPORARY_TABLES);
    // block info is 1+1+1+4+1 bytes, plus one custom byte per column
    assert_eq!(new_len - old_len, 8 + 2);
    assert_eq!(decoded.columns, block.columns);
  }

  #[test]
  fn zero_row_block_has_no_column_data() {
    let header = Block::from_columns(vec![
      Column::new("x", "Int32", ColumnData::Int32(Vec::new())).unwrap(),
    ])
    .unwrap();
    let (decoded, len) = reencode(&header, REVISION);
    // info(8) + ncols(1) + nrows(1) + name(2) + type(6) + custom(1)
    assert_eq!(len, 19);
    assert_eq!(decoded.num_rows, 0);
    assert_eq!(decoded.columns[0].data, ColumnData::Int32(Vec::new()));
  }

  #[test]
  fn custom_serialization_rejected() {
    let mut w = ProtoWriter::new(Vec::new());
    BlockInfo::default().encode(&mut w).unwrap();
    w.write_uvarint(1).unwrap();
    w.write_uvarint(1).unwrap();
    w.write_string("sparse").unwrap();
    w.write_string("UInt8").unwrap();
    w.write_byte(1).unwrap();

    let mut r = ProtoReader::new(Cursor::new(w.into_inner()));
    assert!(matches!(
      Block::decode(&mut r, REVISION),
      Err(TypeError::CustomSerialization { ref column }) if column == "sparse"
    ));
  }

  #[test]
  fn zero_width_fixed_string_rejected_before_reading_rows() {
    let mut w = ProtoWriter::new(Vec::new());
    BlockInfo::default().encode(&mut w).unwrap();
    w.write_uvarint(1).unwrap();
    w.write_uvarint(1 << 40).unwrap();
    w.write_string("blob").unwrap();
    w.write_string("FixedString(0)").unwrap();
    w.write_byte(0).unwrap();

    let mut r = ProtoReader::new(Cursor::new(w.into_inner()));
    assert!(matches!(
      Block::decode(&mut r, REVISION),
      Err(TypeError::UnsupportedColumnType { ref type_name }) if type_name == "FixedString(0)"
    ));
  }

  #[test]
  fn unknown_info_field_rejected() {
    let mut r = ProtoReader::new(Cursor::new(vec![0x03, 0x00]));
    assert!(matches!(
      BlockInfo::decode(&mut r),
      Err(TypeError::UnknownBlockInfoField { field: 3 })
    ));
  }

  #[test]
  fn mismatched_columns_rejected() {
    let result = Block::from_columns(vec![
      Column::new("a", "UInt8", ColumnData::UInt8(vec![1, 2])).unwrap(),
      Column::new("b", "UInt8", ColumnData::UInt8(vec![1])).unwrap(),
    ]);
    assert!(matches!(
      result,
      Err(TypeError::RowCountMismatch { expected: 2, found: 1, .. })
    ));
  }
}
