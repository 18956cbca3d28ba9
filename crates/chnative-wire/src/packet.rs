//! Wire constants shared by every layer above: the packet discriminator
//! bytes the server sends and the protocol revisions that gate optional
//! payload fields.

/// Server → client packet discriminators.
///
/// These are the raw byte values; `chnative_types::PacketKind` is the
/// typed view. Only the codes that can legitimately appear while a query
/// is running get a named `PacketKind` variant. The rest are listed here
/// so diagnostics can name them.
pub mod server {
    pub const HELLO: u8 = 0;
    pub const DATA: u8 = 1;
    pub const EXCEPTION: u8 = 2;
    pub const PROGRESS: u8 = 3;
    pub const PONG: u8 = 4;
    pub const END_OF_STREAM: u8 = 5;
    pub const PROFILE_INFO: u8 = 6;
    pub const TOTALS: u8 = 7;
    pub const EXTREMES: u8 = 8;
    pub const TABLES_STATUS_RESPONSE: u8 = 9;
    pub const LOG: u8 = 10;
    pub const TABLE_COLUMNS: u8 = 11;
    pub const PART_UUIDS: u8 = 12;
    pub const READ_TASK_REQUEST: u8 = 13;
    pub const PROFILE_EVENTS: u8 = 14;
}

/// Protocol revisions at which payload shapes changed.
///
/// A field gated on revision `R` is present on the wire iff the
/// negotiated revision is `>= R`.
pub mod revision {
    /// Data packets carry a temporary-table name before the block.
    pub const WITH_TEMPORARY_TABLES: u64 = 50264;
    /// Progress carries `total_rows`.
    pub const WITH_TOTAL_ROWS_IN_PROGRESS: u64 = 51554;
    /// Blocks start with the field-numbered `BlockInfo` section.
    pub const WITH_BLOCK_INFO: u64 = 51903;
    /// Progress carries `written_rows` / `written_bytes`.
    pub const WITH_CLIENT_WRITE_INFO: u64 = 54420;
    /// Each column header carries a `has_custom` serialization byte.
    pub const WITH_CUSTOM_SERIALIZATION: u64 = 54454;
    /// Progress carries `elapsed_ns`.
    pub const WITH_SERVER_QUERY_TIME_IN_PROGRESS: u64 = 54460;
    /// ProfileInfo carries `applied_aggregation` / `rows_before_aggregation`.
    pub const WITH_ROWS_BEFORE_AGGREGATION: u64 = 54469;

    /// Revision a client negotiates by default.
    pub const DEFAULT: u64 = WITH_SERVER_QUERY_TIME_IN_PROGRESS;
}

/// Human-readable name for a raw server discriminator, for log lines and
/// error messages.
pub fn server_packet_name(code: u8) -> Option<&'static str> {
    Some(match code {
        server::HELLO => "Hello",
        server::DATA => "Data",
        server::EXCEPTION => "Exception",
        server::PROGRESS => "Progress",
        server::PONG => "Pong",
        server::END_OF_STREAM => "EndOfStream",
        server::PROFILE_INFO => "ProfileInfo",
        server::TOTALS => "Totals",
        server::EXTREMES => "Extremes",
        server::TABLES_STATUS_RESPONSE => "TablesStatusResponse",
        server::LOG => "Log",
        server::TABLE_COLUMNS => "TableColumns",
        server::PART_UUIDS => "PartUUIDs",
        server::READ_TASK_REQUEST => "ReadTaskRequest",
        server::PROFILE_EVENTS => "ProfileEvents",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_below_fifteen_is_named() {
        for code in 0..=14 {
            assert!(server_packet_name(code).is_some(), "no name for {code}");
        }
        assert_eq!(server_packet_name(15), None);
        assert_eq!(server_packet_name(0xFF), None);
    }

    #[test]
    fn revisions_are_ordered() {
        assert!(revision::WITH_TEMPORARY_TABLES < revision::WITH_BLOCK_INFO);
        assert!(revision::WITH_CLIENT_WRITE_INFO < revision::WITH_CUSTOM_SERIALIZATION);
        assert!(revision::DEFAULT < revision::WITH_ROWS_BEFORE_AGGREGATION);
    }
}
