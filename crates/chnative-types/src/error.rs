use chnative_wire::WireError;

/// Errors raised while decoding or encoding a typed payload.
///
/// These are higher-level than [`WireError`]: they describe payloads that
/// were read in full but do not make sense (an unsupported column type, a
/// log block missing its `text` column). A `TypeError` wraps the
/// `WireError` when the problem is in the bytes themselves.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                                  │
/// │   ├── block shape: UnsupportedColumnType,               │
/// │   │     CustomSerialization, UnknownBlockInfoField,     │
/// │   │     RowCountMismatch, TooLarge                      │
/// │   ├── LowCardinality: LowCardinality                    │
/// │   ├── side channels: MissingColumn, ColumnTypeMismatch, │
/// │   │     InvalidEnumValue                                │
/// │   └── Wire(WireError) for varint / I/O failures         │
/// └─────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
  /// The column type string names a type this decoder cannot read.
  #[error("unsupported column type: {type_name}")]
  UnsupportedColumnType { type_name: String },

  /// The server announced a custom (sparse) serialization for a column.
  #[error("column {column} uses a custom serialization")]
  CustomSerialization { column: String },

  /// A `BlockInfo` field number outside {0, 1, 2}.
  #[error("unknown block info field {field}")]
  UnknownBlockInfoField { field: u64 },

  /// Columns of one block disagree on their row count.
  #[error("column {column} has {found} rows, expected {expected}")]
  RowCountMismatch {
    column: String,
    expected: usize,
    found: usize,
  },

  /// A count read from the wire does not fit in memory on this platform.
  #[error("{what} {value} is too large")]
  TooLarge { what: &'static str, value: u64 },

  /// Malformed `LowCardinality` column data.
  #[error("invalid LowCardinality column: {reason}")]
  LowCardinality { reason: String },

  /// A side-channel block (Log, ProfileEvents) lacks a required column.
  #[error("{block} block is missing column {column}")]
  MissingColumn {
    block: &'static str,
    column: &'static str,
  },

  /// A side-channel column has the wrong physical type.
  #[error("column {column} has type {found}, expected {expected}")]
  ColumnTypeMismatch {
    column: &'static str,
    expected: &'static str,
    found: String,
  },

  /// An enum-valued cell outside its defined range.
  #[error("invalid {enum_name} value: {value}")]
  InvalidEnumValue { enum_name: &'static str, value: i64 },

  #[error(transparent)]
  Wire(#[from] WireError),
}

impl TypeError {
  /// Extract the underlying transport error, if that is what this is.
  pub fn into_io(self) -> Result<std::io::Error, Self> {
    match self {
      Self::Wire(wire) => wire.into_io().map_err(Self::Wire),
      other => Err(other),
    }
  }
}

impl From<std::io::Error> for TypeError {
  fn from(err: std::io::Error) -> Self {
    Self::Wire(WireError::Io(err))
  }
}
