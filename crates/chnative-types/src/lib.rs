#![warn(clippy::pedantic)]

//! Typed payloads of the ClickHouse native protocol, server side.
//!
//! Each packet the server sends after its one-byte discriminator decodes
//! into one of the types here. Decoders take the connection's negotiated
//! protocol revision because several payloads grew fields over time.
//!
//! ```text
//! ┌────────────────────────┬──────────────────────────────┐
//! │ Packet kind            │ Payload type                 │
//! ├────────────────────────┼──────────────────────────────┤
//! │ Data, Totals, Extremes │ Block                        │
//! │ Exception              │ ServerException              │
//! │ Progress               │ Progress                     │
//! │ ProfileInfo            │ ProfileInfo                  │
//! │ TableColumns           │ TableColumns                 │
//! │ Log                    │ Block → Vec<LogEntry>        │
//! │ ProfileEvents          │ Block → Vec<ProfileEvent>    │
//! │ EndOfStream            │ (none)                       │
//! └────────────────────────┴──────────────────────────────┘
//! ```

pub mod block;
pub mod column;
pub mod error;
pub mod exception;
pub mod log;
pub mod packet_kind;
pub mod profile_event;
pub mod profile_info;
pub mod progress;
pub mod table_columns;

mod side_channel;

pub use block::{Block, BlockInfo};
pub use column::{Column, ColumnData, ColumnType};
pub use error::TypeError;
pub use exception::ServerException;
pub use log::LogEntry;
pub use packet_kind::PacketKind;
pub use profile_event::{ProfileEvent, ProfileEventType};
pub use profile_info::ProfileInfo;
pub use progress::Progress;
pub use table_columns::TableColumns;
