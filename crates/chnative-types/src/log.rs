use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::block::Block;
use crate::column::{Column, ColumnData};
use crate::error::TypeError;
use crate::side_channel::{strings, typed_column};

/// One line of the server's log stream for the running query
/// (`send_logs_level`).
///
/// ```text
/// ┌─────────────────────────┬──────────┬──────────────────────────┐
/// │ Column                  │ Type     │ Field                    │
/// ├─────────────────────────┼──────────┼──────────────────────────┤
/// │ event_time              │ DateTime │ event_time (unix secs)   │
/// │ event_time_microseconds │ UInt32   │ event_time_microseconds  │
/// │ host_name               │ String   │ host_name                │
/// │ query_id                │ String   │ query_id                 │
/// │ thread_id               │ UInt64   │ thread_id                │
/// │ priority                │ Int8     │ priority                 │
/// │ source                  │ String   │ source                   │
/// │ text                    │ String   │ text                     │
/// └─────────────────────────┴──────────┴──────────────────────────┘
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LogEntry {
  pub event_time: u32,
  pub event_time_microseconds: u32,
  pub host_name: String,
  pub query_id: String,
  pub thread_id: u64,
  /// Server log level: 1 = Fatal … 8 = Trace.
  pub priority: i8,
  pub source: String,
  pub text: String,
}

impl LogEntry {
  /// Wall-clock time of the event, to microsecond precision.
  pub fn time(&self) -> SystemTime {
    UNIX_EPOCH
      + Duration::from_secs(u64::from(self.event_time))
      + Duration::from_micros(u64::from(self.event_time_microseconds))
  }

  /// Level name for [`priority`](Self::priority).
  pub fn level(&self) -> &'static str {
    match self.priority {
      1 => "Fatal",
      2 => "Critical",
      3 => "Error",
      4 => "Warning",
      5 => "Notice",
      6 => "Information",
      7 => "Debug",
      8 => "Trace",
      _ => "Unknown",
    }
  }

  /// Read every row of a Log packet's block, in row order.
  ///
  /// # Errors
  ///
  /// [`TypeError::MissingColumn`] or [`TypeError::ColumnTypeMismatch`]
  /// if the block does not have the expected shape.
  pub fn from_block(block: &Block) -> Result<Vec<Self>, TypeError> {
    let event_time = typed_column!(block, "log", "event_time", UInt32)?;
    let micros = typed_column!(block, "log", "event_time_microseconds", UInt32)?;
    let host_name = typed_column!(block, "log", "host_name", String)?;
    let query_id = typed_column!(block, "log", "query_id", String)?;
    let thread_id = typed_column!(block, "log", "thread_id", UInt64)?;
    let priority = typed_column!(block, "log", "priority", Int8)?;
    let source = typed_column!(block, "log", "source", String)?;
    let text = typed_column!(block, "log", "text", String)?;

    Ok((0..block.num_rows)
      .map(|i| Self {
        event_time: event_time[i],
        event_time_microseconds: micros[i],
        host_name: host_name[i].clone(),
        query_id: query_id[i].clone(),
        thread_id: thread_id[i],
        priority: priority[i],
        source: source[i].clone(),
        text: text[i].clone(),
      })
      .collect())
  }

  /// Build the block a server would send for `entries`.
  pub fn to_block(entries: &[Self]) -> Result<Block, TypeError> {
    Block::from_columns(vec![
      Column::new(
        "event_time",
        "DateTime",
        ColumnData::UInt32(entries.iter().map(|e| e.event_time).collect()),
      )?,
      Column::new(
        "event_time_microseconds",
        "UInt32",
        ColumnData::UInt32(entries.iter().map(|e| e.event_time_microseconds).collect()),
      )?,
      Column::new("host_name", "String", strings(entries, |e| e.host_name.as_str()))?,
      Column::new("query_id", "String", strings(entries, |e| e.query_id.as_str()))?,
      Column::new(
        "thread_id",
        "UInt64",
        ColumnData::UInt64(entries.iter().map(|e| e.thread_id).collect()),
      )?,
      Column::new(
        "priority",
        "Int8",
        ColumnData::Int8(entries.iter().map(|e| e.priority).collect()),
      )?,
      Column::new("source", "String", strings(entries, |e| e.source.as_str()))?,
      Column::new("text", "String", strings(entries, |e| e.text.as_str()))?,
    ])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(text: &str) -> LogEntry {
    LogEntry {
      event_time: 1_700_000_000,
      event_time_microseconds: 250,
      host_name: "ch-1".into(),
      query_id: "q-42".into(),
      thread_id: 7,
      priority: 6,
      source: "executeQuery".into(),
      text: text.into(),
    }
  }

  #[test]
  fn rows_come_back_in_order() {
    let entries = vec![entry("Read 1 rows"), entry("Peak memory usage")];
    let block = LogEntry::to_block(&entries).unwrap();
    assert_eq!(block.num_rows, 2);
    assert_eq!(LogEntry::from_block(&block).unwrap(), entries);
  }

  #[test]
  fn empty_block_yields_no_entries() {
    let block = LogEntry::to_block(&[]).unwrap();
    assert!(LogEntry::from_block(&block).unwrap().is_empty());
  }

  #[test]
  fn missing_column_is_reported() {
    let mut block = LogEntry::to_block(&[entry("x")]).unwrap();
    block.columns.retain(|c| c.name != "text");
    assert!(matches!(
      LogEntry::from_block(&block),
      Err(TypeError::MissingColumn { block: "log", column: "text" })
    ));
  }

  #[test]
  fn wrong_physical_type_is_reported() {
    let mut block = LogEntry::to_block(&[entry("x")]).unwrap();
    let thread = block.columns.iter_mut().find(|c| c.name == "thread_id").unwrap();
    *thread = Column::new("thread_id", "String", ColumnData::String(vec!["7".into()])).unwrap();
    match LogEntry::from_block(&block) {
      Err(TypeError::ColumnTypeMismatch { column, expected, found }) => {
        assert_eq!(column, "thread_id");
        assert_eq!(expected, "UInt64");
        assert_eq!(found, "String");
      }
      other => panic!("expected a type mismatch, got {other:?}"),
    }
  }

  #[test]
  fn short_column_is_an_error_not_a_panic() {
    let mut block = LogEntry::to_block(&[entry("a"), entry("b")]).unwrap();
    let text = block.columns.iter_mut().find(|c| c.name == "text").unwrap();
    text.data = ColumnData::String(vec!["a".into()]);
    assert!(matches!(
      LogEntry::from_block(&block),
      Err(TypeError::RowCountMismatch { ref column, expected: 2, found: 1 }) if column == "text"
    ));
  }

  #[test]
  fn time_and_level() {
    let e = entry("x");
    assert_eq!(
      e.time().duration_since(UNIX_EPOCH).unwrap(),
      Duration::new(1_700_000_000, 250_000)
    );
    assert_eq!(e.level(), "Information");
  }
}
