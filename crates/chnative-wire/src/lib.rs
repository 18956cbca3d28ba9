#![warn(clippy::pedantic)]

//! Primitive encoding for the ClickHouse native protocol: varints,
//! little-endian integers, length-prefixed strings, packet codes and the
//! compressed frame envelope.

pub mod error;
pub mod frame;
pub mod packet;
pub mod reader;
pub mod varint;
pub mod writer;

pub use error::WireError;
pub use frame::{CompressionMethod, FrameHeader};
pub use reader::ProtoReader;
pub use writer::ProtoWriter;
