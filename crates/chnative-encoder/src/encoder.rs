use chnative_types::{
    Block, LogEntry, PacketKind, ProfileEvent, ProfileInfo, Progress, ServerException,
    TableColumns,
};
use chnative_wire::packet::{revision, server};
use chnative_wire::{CompressionMethod, ProtoWriter};

use crate::compression::{self, DEFAULT_FRAME_SIZE};
use crate::error::EncodeError;

/// Builder for a server response stream.
///
/// Methods like [`data`](Self::data), [`progress`](Self::progress) and
/// [`end_of_stream`](Self::end_of_stream) append one packet each and
/// return `&mut Self` for chaining; [`encode`](Self::encode) serializes
/// them in order. Nothing is implied: a response without
/// `end_of_stream()` ends without one, which is how tests model a
/// connection that drops mid-query.
///
/// # Compression
///
/// [`compress_blocks`](Self::compress_blocks) wraps the block of every
/// Data, Totals and Extremes packet in compressed frames, as a server
/// does once compression has been negotiated. Log and ProfileEvents
/// blocks are never compressed, matching the server.
///
/// # Usage
///
/// ```rust
/// use chnative_encoder::ResponseEncoder;
/// use chnative_types::{Block, Progress};
///
/// let bytes = ResponseEncoder::new()
///     .progress(Progress { rows: 1, ..Progress::default() })
///     .data(Block::default())
///     .end_of_stream()
///     .encode()
///     .unwrap();
/// assert_eq!(bytes.last(), Some(&0x05));
/// ```
///
/// # Output layout
///
/// ```text
/// ┌──────────┬──────────────────────────────────────────────────┐
/// │ [1 byte] │ packet discriminator                             │
/// │ [N]      │ payload (table name + block, counters, ...)      │
/// │ ...      │ next packet                                      │
/// └──────────┴──────────────────────────────────────────────────┘
/// ```
pub struct ResponseEncoder {
    packets: Vec<PendingPacket>,
    revision: u64,
    compression: Option<CompressionMethod>,
    frame_size: usize,
}

/// A packet awaiting serialization.
enum PendingPacket {
    Block {
        kind: PacketKind,
        table_name: String,
        block: Block,
    },
    Logs(Vec<LogEntry>),
    ProfileEvents(Vec<ProfileEvent>),
    Progress(Progress),
    ProfileInfo(ProfileInfo),
    TableColumns(TableColumns),
    Exception(ServerException),
    EndOfStream,
    Raw {
        code: u8,
        payload: Vec<u8>,
    },
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEncoder {
    /// An empty response at [`revision::DEFAULT`], uncompressed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            packets: Vec::new(),
            revision: revision::DEFAULT,
            compression: None,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    // ── Configuration ───────────────────────────────────────────────────

    /// Encode revision-gated fields as a server at `revision` would.
    pub fn with_revision(&mut self, revision: u64) -> &mut Self {
        self.revision = revision;
        self
    }

    /// Frame Data, Totals and Extremes blocks with `method`.
    pub fn compress_blocks(&mut self, method: CompressionMethod) -> &mut Self {
        self.compression = Some(method);
        self
    }

    /// Uncompressed bytes per compressed frame.
    pub fn with_frame_size(&mut self, frame_size: usize) -> &mut Self {
        self.frame_size = frame_size;
        self
    }

    // ── Packets ─────────────────────────────────────────────────────────

    /// A query result block.
    pub fn data(&mut self, block: Block) -> &mut Self {
        self.push_block(PacketKind::Data, String::new(), block)
    }

    /// A query result block for an external table.
    pub fn data_for_table(&mut self, table_name: &str, block: Block) -> &mut Self {
        self.push_block(PacketKind::Data, table_name.to_string(), block)
    }

    /// The `WITH TOTALS` row block.
    pub fn totals(&mut self, block: Block) -> &mut Self {
        self.push_block(PacketKind::Totals, String::new(), block)
    }

    /// The `extremes = 1` min/max block.
    pub fn extremes(&mut self, block: Block) -> &mut Self {
        self.push_block(PacketKind::Extremes, String::new(), block)
    }

    pub fn progress(&mut self, progress: Progress) -> &mut Self {
        self.packets.push(PendingPacket::Progress(progress));
        self
    }

    pub fn profile_info(&mut self, info: ProfileInfo) -> &mut Self {
        self.packets.push(PendingPacket::ProfileInfo(info));
        self
    }

    pub fn table_columns(&mut self, columns: TableColumns) -> &mut Self {
        self.packets.push(PendingPacket::TableColumns(columns));
        self
    }

    /// A Log packet. Its block is built from `entries` at encode time.
    pub fn logs(&mut self, entries: &[LogEntry]) -> &mut Self {
        self.packets.push(PendingPacket::Logs(entries.to_vec()));
        self
    }

    pub fn profile_events(&mut self, events: &[ProfileEvent]) -> &mut Self {
        self.packets.push(PendingPacket::ProfileEvents(events.to_vec()));
        self
    }

    /// A side-channel packet carrying an arbitrary block, e.g. a Log
    /// block with a column missing.
    pub fn block_packet(&mut self, kind: PacketKind, block: Block) -> &mut Self {
        self.push_block(kind, String::new(), block)
    }

    pub fn exception(&mut self, exception: ServerException) -> &mut Self {
        self.packets.push(PendingPacket::Exception(exception));
        self
    }

    pub fn end_of_stream(&mut self) -> &mut Self {
        self.packets.push(PendingPacket::EndOfStream);
        self
    }

    /// A discriminator followed by arbitrary bytes.
    pub fn raw_packet(&mut self, code: u8, payload: &[u8]) -> &mut Self {
        self.packets.push(PendingPacket::Raw {
            code,
            payload: payload.to_vec(),
        });
        self
    }

    fn push_block(&mut self, kind: PacketKind, table_name: String, block: Block) -> &mut Self {
        self.packets.push(PendingPacket::Block {
            kind,
            table_name,
            block,
        });
        self
    }

    // ── Serialization ───────────────────────────────────────────────────

    /// Serialize every packet, in the order they were added.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::UnsupportedCompression`] if LZ4 framing was
    ///   requested and a result block is present.
    /// - [`EncodeError::Type`] if a block's columns do not match their
    ///   declared types.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut w = ProtoWriter::new(Vec::with_capacity(self.packets.len() * 64));
        for packet in &self.packets {
            self.write_packet(&mut w, packet)?;
        }
        Ok(w.into_inner())
    }

    /// Block-carrying packets name their table from revision 50264 on.
    fn write_table_name(
        &self,
        w: &mut ProtoWriter<Vec<u8>>,
        name: &str,
    ) -> Result<(), EncodeError> {
        if self.revision >= revision::WITH_TEMPORARY_TABLES {
            w.write_string(name)?;
        }
        Ok(())
    }

    fn write_packet(
        &self,
        w: &mut ProtoWriter<Vec<u8>>,
        packet: &PendingPacket,
    ) -> Result<(), EncodeError> {
        match packet {
            PendingPacket::Block {
                kind,
                table_name,
                block,
            } => {
                w.write_byte(kind.wire_id())?;
                self.write_table_name(w, table_name)?;
                match self.compression {
                    Some(method) if kind.is_compressible() => {
                        let mut body = ProtoWriter::new(Vec::new());
                        block.encode(&mut body, self.revision)?;
                        compression::write_frames(w, method, &body.into_inner(), self.frame_size)?;
                    }
                    _ => block.encode(w, self.revision)?,
                }
            }
            PendingPacket::Logs(entries) => {
                w.write_byte(server::LOG)?;
                self.write_table_name(w, "")?;
                LogEntry::to_block(entries)?.encode(w, self.revision)?;
            }
            PendingPacket::ProfileEvents(events) => {
                w.write_byte(server::PROFILE_EVENTS)?;
                self.write_table_name(w, "")?;
                ProfileEvent::to_block(events)?.encode(w, self.revision)?;
            }
            PendingPacket::Progress(progress) => {
                w.write_byte(server::PROGRESS)?;
                progress.encode(w, self.revision)?;
            }
            PendingPacket::ProfileInfo(info) => {
                w.write_byte(server::PROFILE_INFO)?;
                info.encode(w, self.revision)?;
            }
            PendingPacket::TableColumns(columns) => {
                w.write_byte(server::TABLE_COLUMNS)?;
                columns.encode(w)?;
            }
            PendingPacket::Exception(exception) => {
                w.write_byte(server::EXCEPTION)?;
                exception.encode(w)?;
            }
            PendingPacket::EndOfStream => w.write_byte(server::END_OF_STREAM)?,
            PendingPacket::Raw { code, payload } => {
                w.write_byte(*code)?;
                w.write_raw(payload)?;
            }
        }
        Ok(())
    }
}
