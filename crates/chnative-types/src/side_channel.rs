//! Column lookup shared by the Log and ProfileEvents block readers.
//!
//! Both packets carry an ordinary [`Block`] whose columns are then read
//! back by name as rows of a fixed record type. Columns the record does
//! not know are ignored, so newer servers may add columns freely.

use crate::block::Block;
use crate::column::ColumnData;
use crate::error::TypeError;

/// Fetch a column by name. Its length must match the block's row count,
/// so callers can index it by row.
pub(crate) fn column<'a>(
  block: &'a Block,
  block_name: &'static str,
  name: &'static str,
) -> Result<&'a ColumnData, TypeError> {
  let column = block.column(name).ok_or(TypeError::MissingColumn {
    block: block_name,
    column: name,
  })?;
  if column.len() != block.num_rows {
    return Err(TypeError::RowCountMismatch {
      column: column.name.clone(),
      expected: block.num_rows,
      found: column.len(),
    });
  }
  Ok(&column.data)
}

pub(crate) fn mismatch(name: &'static str, expected: &'static str, found: &ColumnData) -> TypeError {
  TypeError::ColumnTypeMismatch {
    column: name,
    expected,
    found: found.physical_name().to_string(),
  }
}

/// Project one string field out of a record list.
pub(crate) fn strings<T>(rows: &[T], field: impl Fn(&T) -> &str) -> ColumnData {
  ColumnData::String(rows.iter().map(|row| field(row).to_string()).collect())
}

/// Fetch a column by name and unwrap it as one physical variant.
///
/// ```ignore
/// let text: &Vec<String> = typed_column!(block, "log", "text", String)?;
/// ```
macro_rules! typed_column {
  ($block:expr, $block_name:literal, $name:literal, $variant:ident) => {
    match $crate::side_channel::column($block, $block_name, $name) {
      Ok($crate::column::ColumnData::$variant(values)) => Ok(values),
      Ok(other) => Err($crate::side_channel::mismatch($name, stringify!($variant), other)),
      Err(e) => Err(e),
    }
  };
}

pub(crate) use typed_column;
