use std::io::{Read, Write};

use chnative_wire::{ProtoReader, ProtoWriter};

use crate::error::TypeError;

/// Column types this decoder understands, parsed from the type string
/// the server sends in each column header.
///
/// Several logical types share a physical representation:
///
/// ```text
/// ┌─────────────────────────┬────────────────────┬──────────────────┐
/// │ Type string             │ Variant            │ Stored as        │
/// ├─────────────────────────┼────────────────────┼──────────────────┤
/// │ UInt8 … UInt64          │ UInt8 … UInt64     │ Vec<u8 … u64>    │
/// │ Int8 … Int64            │ Int8 … Int64       │ Vec<i8 … i64>    │
/// │ Float32 / Float64       │ Float32 / Float64  │ Vec<f32 / f64>   │
/// │ String                  │ String             │ Vec<String>      │
/// │ FixedString(N)          │ FixedString(N)     │ Vec<Vec<u8>>     │
/// │ DateTime, DateTime(tz)  │ DateTime           │ Vec<u32>         │
/// │ Enum8(...)              │ Enum8              │ Vec<i8>          │
/// │ Enum16(...)             │ Enum16             │ Vec<i16>         │
/// │ LowCardinality(String)  │ LowCardinalityStr  │ Vec<String>      │
/// └─────────────────────────┴────────────────────┴──────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    FixedString(usize),
    DateTime,
    Enum8,
    Enum16,
    LowCardinalityString,
}

impl ColumnType {
    /// Parse a server type string.
    ///
    /// # Errors
    ///
    /// [`TypeError::UnsupportedColumnType`] for anything outside the table
    /// above (Nullable, Array, Decimal, ...).
    pub fn parse(type_name: &str) -> Result<Self, TypeError> {
        let name = type_name.trim();
        let parsed = match name {
            "UInt8" | "Bool" => Some(Self::UInt8),
            "UInt16" => Some(Self::UInt16),
            "UInt32" => Some(Self::UInt32),
            "UInt64" => Some(Self::UInt64),
            "Int8" => Some(Self::Int8),
            "Int16" => Some(Self::Int16),
            "Int32" => Some(Self::Int32),
            "Int64" => Some(Self::Int64),
            "Float32" => Some(Self::Float32),
            "Float64" => Some(Self::Float64),
            "String" => Some(Self::String),
            "DateTime" => Some(Self::DateTime),
            "LowCardinality(String)" => Some(Self::LowCardinalityString),
            _ => Self::parse_parameterized(name),
        };
        parsed.ok_or_else(|| TypeError::UnsupportedColumnType {
            type_name: type_name.to_string(),
        })
    }

    fn parse_parameterized(name: &str) -> Option<Self> {
        let (head, args) = name.strip_suffix(')')?.split_once('(')?;
        match head {
            // A zero width would let the row count alone drive allocation.
            "FixedString" => args
                .trim()
                .parse()
                .ok()
                .filter(|&width: &usize| width > 0)
                .map(Self::FixedString),
            "DateTime" => Some(Self::DateTime),
            "Enum8" => Some(Self::Enum8),
            "Enum16" => Some(Self::Enum16),
            _ => None,
        }
    }
}

/// Decoded values of one column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
    FixedString(Vec<Vec<u8>>),
}

// LowCardinality serialization constants (shared dictionaries with
// additional keys, the only version the server writes).
const LC_KEY_VERSION: u64 = 1;
const LC_KEY_TYPE_MASK: u64 = 0xFF;
const LC_NEED_GLOBAL_DICTIONARY: u64 = 1 << 8;
const LC_HAS_ADDITIONAL_KEYS: u64 = 1 << 9;
const LC_NEED_UPDATE_DICTIONARY: u64 = 1 << 10;

macro_rules! read_rows {
    ($r:expr, $rows:expr, $method:ident) => {
        (0..$rows)
            .map(|_| $r.$method())
            .collect::<Result<Vec<_>, _>>()?
    };
}

macro_rules! write_rows {
    ($w:expr, $values:expr, $method:ident) => {
        for v in $values {
            $w.$method(*v)?;
        }
    };
}

impl ColumnData {
    /// An empty column of the physical type `ty` maps to.
    pub fn empty(ty: &ColumnType) -> Self {
        match ty {
            ColumnType::UInt8 => Self::UInt8(Vec::new()),
            ColumnType::UInt16 => Self::UInt16(Vec::new()),
            ColumnType::UInt32 | ColumnType::DateTime => Self::UInt32(Vec::new()),
            ColumnType::UInt64 => Self::UInt64(Vec::new()),
            ColumnType::Int8 | ColumnType::Enum8 => Self::Int8(Vec::new()),
            ColumnType::Int16 | ColumnType::Enum16 => Self::Int16(Vec::new()),
            ColumnType::Int32 => Self::Int32(Vec::new()),
            ColumnType::Int64 => Self::Int64(Vec::new()),
            ColumnType::Float32 => Self::Float32(Vec::new()),
            ColumnType::Float64 => Self::Float64(Vec::new()),
            ColumnType::String | ColumnType::LowCardinalityString => Self::String(Vec::new()),
            ColumnType::FixedString(_) => Self::FixedString(Vec::new()),
        }
    }

    /// Read `rows` values of type `ty`.
    ///
    /// For `LowCardinality` this includes the serialization state prefix.
    /// Callers must not call this for zero-row blocks: the server writes
    /// no column data at all in that case.
    pub fn decode<R: Read>(
        ty: &ColumnType,
        r: &mut ProtoReader<R>,
        rows: usize,
    ) -> Result<Self, TypeError> {
        Ok(match ty {
            ColumnType::UInt8 => Self::UInt8(r.read_bytes(rows as u64)?),
            ColumnType::UInt16 => Self::UInt16(read_rows!(r, rows, read_u16)),
            ColumnType::UInt32 | ColumnType::DateTime => {
                Self::UInt32(read_rows!(r, rows, read_u32))
            }
            ColumnType::UInt64 => Self::UInt64(read_rows!(r, rows, read_u64)),
            ColumnType::Int8 | ColumnType::Enum8 => Self::Int8(read_rows!(r, rows, read_i8)),
            ColumnType::Int16 | ColumnType::Enum16 => Self::Int16(read_rows!(r, rows, read_i16)),
            ColumnType::Int32 => Self::Int32(read_rows!(r, rows, read_i32)),
            ColumnType::Int64 => Self::Int64(read_rows!(r, rows, read_i64)),
            ColumnType::Float32 => Self::Float32(read_rows!(r, rows, read_f32)),
            ColumnType::Float64 => Self::Float64(read_rows!(r, rows, read_f64)),
            ColumnType::String => Self::String(read_rows!(r, rows, read_string)),
            ColumnType::FixedString(width) => Self::FixedString(
                (0..rows)
                    .map(|_| r.read_bytes(*width as u64))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            ColumnType::LowCardinalityString => Self::String(decode_low_cardinality(r, rows)?),
        })
    }

    /// Write the values in the layout `ty` expects on the wire.
    ///
    /// # Errors
    ///
    /// [`TypeError::ColumnTypeMismatch`] if the data does not have the
    /// physical type `ty` maps to.
    pub fn encode<W: Write>(&self, ty: &ColumnType, w: &mut ProtoWriter<W>) -> Result<(), TypeError> {
        match (ty, self) {
            (ColumnType::UInt8, Self::UInt8(v)) => w.write_raw(v)?,
            (ColumnType::UInt16, Self::UInt16(v)) => write_rows!(w, v, write_u16),
            (ColumnType::UInt32 | ColumnType::DateTime, Self::UInt32(v)) => {
                write_rows!(w, v, write_u32);
            }
            (ColumnType::UInt64, Self::UInt64(v)) => write_rows!(w, v, write_u64),
            (ColumnType::Int8 | ColumnType::Enum8, Self::Int8(v)) => write_rows!(w, v, write_i8),
            (ColumnType::Int16 | ColumnType::Enum16, Self::Int16(v)) => {
                write_rows!(w, v, write_i16);
            }
            (ColumnType::Int32, Self::Int32(v)) => write_rows!(w, v, write_i32),
            (ColumnType::Int64, Self::Int64(v)) => write_rows!(w, v, write_i64),
            (ColumnType::Float32, Self::Float32(v)) => write_rows!(w, v, write_f32),
            (ColumnType::Float64, Self::Float64(v)) => write_rows!(w, v, write_f64),
            (ColumnType::String, Self::String(v)) => {
                for s in v {
                    w.write_string(s)?;
                }
            }
            (ColumnType::FixedString(width), Self::FixedString(v)) => {
                for value in v {
                    let mut cell = value.clone();
                    cell.resize(*width, 0);
                    w.write_raw(&cell)?;
                }
            }
            (ColumnType::LowCardinalityString, Self::String(v)) => encode_low_cardinality(w, v)?,
            (expected, found) => {
                return Err(TypeError::ColumnTypeMismatch {
                    column: "<encode>",
                    expected: physical_name_of(expected),
                    found: found.physical_name().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::UInt8(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::String(v) => v.len(),
            Self::FixedString(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the physical representation, for error messages.
    pub fn physical_name(&self) -> &'static str {
        match self {
            Self::UInt8(_) => "UInt8",
            Self::UInt16(_) => "UInt16",
            Self::UInt32(_) => "UInt32",
            Self::UInt64(_) => "UInt64",
            Self::Int8(_) => "Int8",
            Self::Int16(_) => "Int16",
            Self::Int32(_) => "Int32",
            Self::Int64(_) => "Int64",
            Self::Float32(_) => "Float32",
            Self::Float64(_) => "Float64",
            Self::String(_) => "String",
            Self::FixedString(_) => "FixedString",
        }
    }
}

fn physical_name_of(ty: &ColumnType) -> &'static str {
    ColumnData::empty(ty).physical_name()
}

/// Read a `LowCardinality(String)` column: state prefix, then one
/// granule of dictionary + indices.
///
/// ```text
/// ┌──────────────────────────────────────────────────────┐
/// │ key_version        (u64 LE, must be 1)               │
/// │ serialization_type (u64 LE, low byte = index width)  │
/// │ dictionary_len     (u64 LE)                          │
/// │ dictionary         [dictionary_len strings]          │
/// │ rows               (u64 LE)                          │
/// │ indices            [rows × 1/2/4/8 bytes LE]         │
/// └──────────────────────────────────────────────────────┘
/// ```
fn decode_low_cardinality<R: Read>(
    r: &mut ProtoReader<R>,
    rows: usize,
) -> Result<Vec<String>, TypeError> {
    let version = r.read_u64()?;
    if version != LC_KEY_VERSION {
        return Err(TypeError::LowCardinality {
            reason: format!("key version {version}, expected {LC_KEY_VERSION}"),
        });
    }

    let serialization = r.read_u64()?;
    if serialization & LC_NEED_GLOBAL_DICTIONARY != 0 {
        return Err(TypeError::LowCardinality {
            reason: "global dictionaries are not supported".to_string(),
        });
    }

    let dictionary_len = r.read_u64()?;
    let dictionary: Vec<String> = (0..dictionary_len)
        .map(|_| r.read_string())
        .collect::<Result<_, _>>()?;

    let index_rows = r.read_u64()?;
    if index_rows != rows as u64 {
        return Err(TypeError::LowCardinality {
            reason: format!("{index_rows} indices for {rows} rows"),
        });
    }

    let read_index = |r: &mut ProtoReader<R>| -> Result<u64, TypeError> {
        Ok(match serialization & LC_KEY_TYPE_MASK {
            0 => u64::from(r.read_byte()?),
            1 => u64::from(r.read_u16()?),
            2 => u64::from(r.read_u32()?),
            3 => r.read_u64()?,
            other => {
                return Err(TypeError::LowCardinality {
                    reason: format!("index type {other}"),
                });
            }
        })
    };

    (0..rows)
        .map(|_| {
            let index = read_index(r)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| dictionary.get(i))
                .cloned()
                .ok_or_else(|| TypeError::LowCardinality {
                    reason: format!("index {index} outside dictionary of {}", dictionary.len()),
                })
        })
        .collect()
}

fn encode_low_cardinality<W: Write>(
    w: &mut ProtoWriter<W>,
    values: &[String],
) -> Result<(), TypeError> {
    let mut dictionary: Vec<&str> = Vec::new();
    let mut indices = Vec::with_capacity(values.len());
    for value in values {
        let index = match dictionary.iter().position(|d| *d == value.as_str()) {
            Some(i) => i,
            None => {
                dictionary.push(value);
                dictionary.len() - 1
            }
        };
        indices.push(index as u64);
    }

    let key_type: u64 = match dictionary.len() {
        0..=0xFF => 0,
        0x100..=0xFFFF => 1,
        0x1_0000..=0xFFFF_FFFF => 2,
        _ => 3,
    };

    w.write_u64(LC_KEY_VERSION)?;
    w.write_u64(key_type | LC_HAS_ADDITIONAL_KEYS | LC_NEED_UPDATE_DICTIONARY)?;
    w.write_u64(dictionary.len() as u64)?;
    for key in &dictionary {
        w.write_string(key)?;
    }
    w.write_u64(indices.len() as u64)?;
    #[allow(clippy::cast_possible_truncation)]
    for index in indices {
        match key_type {
            0 => w.write_byte(index as u8)?,
            1 => w.write_u16(index as u16)?,
            2 => w.write_u32(index as u32)?,
            _ => w.write_u64(index)?,
        }
    }
    Ok(())
}

/// One named, typed column of a [`Block`](crate::Block).
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    /// The type string exactly as the server sent it.
    pub type_name: String,
    pub data: ColumnData,
}

impl Column {
    /// Build a column, checking that `data` matches `type_name`.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        data: ColumnData,
    ) -> Result<Self, TypeError> {
        let type_name = type_name.into();
        let ty = ColumnType::parse(&type_name)?;
        let expected = physical_name_of(&ty);
        if expected != data.physical_name() {
            return Err(TypeError::ColumnTypeMismatch {
                column: "<new>",
                expected,
                found: data.physical_name().to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            type_name,
            data,
        })
    }

    pub fn column_type(&self) -> Result<ColumnType, TypeError> {
        ColumnType::parse(&self.type_name)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
