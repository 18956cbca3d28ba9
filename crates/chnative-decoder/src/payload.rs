//! Per-kind payload readers.
//!
//! Each function consumes exactly one packet body (the discriminator has
//! already been read) and nothing more.

use std::io::Read;

use chnative_types::{
    Block, LogEntry, PacketKind, ProfileEvent, ProfileInfo, Progress, ServerException,
    TableColumns, TypeError,
};
use chnative_wire::ProtoReader;
use chnative_wire::packet::revision;

use crate::compression::CompressedReader;
use crate::config::DecoderConfig;

/// Table name (revision ≥ 50264), then a block that is framed when
/// compression is on and the kind is Data, Totals or Extremes.
pub(crate) fn read_block<R: Read>(
    r: &mut ProtoReader<R>,
    config: &DecoderConfig,
    kind: PacketKind,
) -> Result<Block, TypeError> {
    if config.revision >= revision::WITH_TEMPORARY_TABLES {
        let _table_name = r.read_string()?;
    }
    if config.compression && kind.is_compressible() {
        let mut framed = ProtoReader::new(CompressedReader::new(r, config.max_block_size));
        Block::decode(&mut framed, config.revision)
    } else {
        Block::decode(r, config.revision)
    }
}

pub(crate) fn read_logs<R: Read>(
    r: &mut ProtoReader<R>,
    config: &DecoderConfig,
) -> Result<Vec<LogEntry>, TypeError> {
    let block = read_block(r, config, PacketKind::Log)?;
    LogEntry::from_block(&block)
}

pub(crate) fn read_profile_events<R: Read>(
    r: &mut ProtoReader<R>,
    config: &DecoderConfig,
) -> Result<Vec<ProfileEvent>, TypeError> {
    let block = read_block(r, config, PacketKind::ProfileEvents)?;
    ProfileEvent::from_block(&block)
}

pub(crate) fn read_progress<R: Read>(
    r: &mut ProtoReader<R>,
    config: &DecoderConfig,
) -> Result<Progress, TypeError> {
    Progress::decode(r, config.revision)
}

pub(crate) fn read_profile_info<R: Read>(
    r: &mut ProtoReader<R>,
    config: &DecoderConfig,
) -> Result<ProfileInfo, TypeError> {
    ProfileInfo::decode(r, config.revision)
}

pub(crate) fn read_table_columns<R: Read>(
    r: &mut ProtoReader<R>,
) -> Result<TableColumns, TypeError> {
    TableColumns::decode(r)
}

pub(crate) fn read_exception<R: Read>(
    r: &mut ProtoReader<R>,
) -> Result<ServerException, TypeError> {
    ServerException::decode(r)
}
