use std::fmt;

use crate::block::Block;
use crate::column::{Column, ColumnData};
use crate::error::TypeError;
use crate::side_channel::{self, strings, typed_column};

/// How a profile counter's value should be combined with earlier ones.
///
/// ```text
/// ┌──────┬───────────┬─────────────────────────────────┐
/// │ Wire │ Variant   │ Meaning                         │
/// ├──────┼───────────┼─────────────────────────────────┤
/// │ 1    │ Increment │ delta since the previous packet │
/// │ 2    │ Gauge     │ current absolute value          │
/// └──────┴───────────┴─────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileEventType {
  Increment,
  Gauge,
}

impl ProfileEventType {
  pub fn to_wire(self) -> i8 {
    match self {
      Self::Increment => 1,
      Self::Gauge => 2,
    }
  }

  pub fn from_wire(value: i8) -> Result<Self, TypeError> {
    match value {
      1 => Ok(Self::Increment),
      2 => Ok(Self::Gauge),
      other => Err(TypeError::InvalidEnumValue {
        enum_name: "ProfileEventType",
        value: i64::from(other),
      }),
    }
  }
}

impl fmt::Display for ProfileEventType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Increment => "increment",
      Self::Gauge => "gauge",
    })
  }
}

/// A named performance counter reported by the server
/// (`SelectedRows`, `MemoryTrackerUsage`, ...).
///
/// Servers have shipped `name` as both `String` and
/// `LowCardinality(String)`, and `value` as both `UInt64` and `Int64`;
/// either is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProfileEvent {
  pub host_name: String,
  /// Unix seconds.
  pub current_time: u32,
  pub thread_id: u64,
  pub event_type: ProfileEventType,
  pub name: String,
  pub value: i64,
}

impl ProfileEvent {
  /// Read every row of a ProfileEvents packet's block, in row order.
  pub fn from_block(block: &Block) -> Result<Vec<Self>, TypeError> {
    let host_name = typed_column!(block, "profile events", "host_name", String)?;
    let current_time = typed_column!(block, "profile events", "current_time", UInt32)?;
    let thread_id = typed_column!(block, "profile events", "thread_id", UInt64)?;
    let event_type = typed_column!(block, "profile events", "type", Int8)?;
    let name = typed_column!(block, "profile events", "name", String)?;
    let value = side_channel::column(block, "profile events", "value")?;

    let values: Vec<i64> = match value {
      ColumnData::Int64(v) => v.clone(),
      ColumnData::UInt64(v) => v
        .iter()
        .map(|&x| {
          i64::try_from(x).map_err(|_| TypeError::TooLarge {
            what: "profile event value",
            value: x,
          })
        })
        .collect::<Result<_, _>>()?,
      other => return Err(side_channel::mismatch("value", "Int64", other)),
    };

    (0..block.num_rows)
      .map(|i| {
        Ok(Self {
          host_name: host_name[i].clone(),
          current_time: current_time[i],
          thread_id: thread_id[i],
          event_type: ProfileEventType::from_wire(event_type[i])?,
          name: name[i].clone(),
          value: values[i],
        })
      })
      .collect()
  }

  /// Build the block a current server would send for `events`.
  pub fn to_block(events: &[Self]) -> Result<Block, TypeError> {
    Block::from_columns(vec![
      Column::new("host_name", "String", strings(events, |e| e.host_name.as_str()))?,
      Column::new(
        "current_time",
        "DateTime('UTC')",
        ColumnData::UInt32(events.iter().map(|e| e.current_time).collect()),
      )?,
      Column::new(
        "thread_id",
        "UInt64",
        ColumnData::UInt64(events.iter().map(|e| e.thread_id).collect()),
      )?,
      Column::new(
        "type",
        "Enum8('increment' = 1, 'gauge' = 2)",
        ColumnData::Int8(events.iter().map(|e| e.event_type.to_wire()).collect()),
      )?,
      Column::new(
        "name",
        "LowCardinality(String)",
        strings(events, |e| e.name.as_str()),
      )?,
      Column::new(
        "value",
        "Int64",
        ColumnData::Int64(events.iter().map(|e| e.value).collect()),
      )?,
    ])
  }
}
