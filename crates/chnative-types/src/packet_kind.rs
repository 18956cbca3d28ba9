use std::fmt;

use chnative_wire::packet::{server, server_packet_name};

/// Kind of a server packet, identified by its one-byte discriminator.
///
/// Only the packets a server sends while a query is running get a named
/// variant. Everything else, including codes that are valid elsewhere in
/// the protocol (Hello, Pong), is captured by `Unknown(u8)` so the
/// dispatcher has an explicit arm for protocol violations.
///
/// ```text
/// ┌──────┬───────────────┬──────────────────────────────────────┐
/// │ Wire │ Variant       │ Payload                              │
/// ├──────┼───────────────┼──────────────────────────────────────┤
/// │ 1    │ Data          │ table name + result block            │
/// │ 2    │ Exception     │ server error chain                   │
/// │ 3    │ Progress      │ execution counters                   │
/// │ 5    │ EndOfStream   │ none, terminates the exchange        │
/// │ 6    │ ProfileInfo   │ rows/blocks/bytes summary            │
/// │ 7    │ Totals        │ table name + WITH TOTALS block       │
/// │ 8    │ Extremes      │ table name + min/max block           │
/// │ 10   │ Log           │ table name + server log block        │
/// │ 11   │ TableColumns  │ table name + column description      │
/// │ 14   │ ProfileEvents │ table name + profile counter block   │
/// │ else │ Unknown       │ protocol violation                   │
/// └──────┴───────────────┴──────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Data,
    Exception,
    Progress,
    EndOfStream,
    ProfileInfo,
    Totals,
    Extremes,
    Log,
    TableColumns,
    ProfileEvents,
    /// A discriminator that has no business appearing in a query
    /// response. The raw byte is kept for the error report.
    Unknown(u8),
}

impl PacketKind {
    pub fn wire_id(self) -> u8 {
        match self {
            Self::Data => server::DATA,
            Self::Exception => server::EXCEPTION,
            Self::Progress => server::PROGRESS,
            Self::EndOfStream => server::END_OF_STREAM,
            Self::ProfileInfo => server::PROFILE_INFO,
            Self::Totals => server::TOTALS,
            Self::Extremes => server::EXTREMES,
            Self::Log => server::LOG,
            Self::TableColumns => server::TABLE_COLUMNS,
            Self::ProfileEvents => server::PROFILE_EVENTS,
            Self::Unknown(id) => id,
        }
    }

    pub fn from_wire_id(id: u8) -> Self {
        match id {
            server::DATA => Self::Data,
            server::EXCEPTION => Self::Exception,
            server::PROGRESS => Self::Progress,
            server::END_OF_STREAM => Self::EndOfStream,
            server::PROFILE_INFO => Self::ProfileInfo,
            server::TOTALS => Self::Totals,
            server::EXTREMES => Self::Extremes,
            server::LOG => Self::Log,
            server::TABLE_COLUMNS => Self::TableColumns,
            server::PROFILE_EVENTS => Self::ProfileEvents,
            other => Self::Unknown(other),
        }
    }

    /// Data, Totals and Extremes share one payload layout and one route.
    pub fn carries_result_block(self) -> bool {
        matches!(self, Self::Data | Self::Totals | Self::Extremes)
    }

    /// Whether the block in this packet travels inside compressed frames
    /// when compression is negotiated. Log and ProfileEvents blocks are
    /// always sent uncompressed.
    pub fn is_compressible(self) -> bool {
        self.carries_result_block()
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => match server_packet_name(*id) {
                Some(name) => write!(f, "{name} ({id:#04X})"),
                None => write!(f, "unknown ({id:#04X})"),
            },
            known => f.write_str(server_packet_name(known.wire_id()).unwrap_or("?")),
        }
    }
}
