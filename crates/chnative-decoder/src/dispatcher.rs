use std::io::{self, Read};

use chnative_types::{Block, PacketKind, TypeError};
use chnative_wire::{ProtoReader, WireError};
use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::error::{DecodeError, Operation};
use crate::handler::PacketHandler;
use crate::payload;

/// When the read loop hands control back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StopAt {
    /// Route everything; stop at EndOfStream.
    EndOfStream,
    /// Additionally stop at the first Data packet and return its block.
    FirstBlock,
}

impl StopAt {
    fn operation(self) -> Operation {
        match self {
            Self::EndOfStream => Operation::Process,
            Self::FirstBlock => Operation::FirstBlock,
        }
    }
}

/// Reads a server's response to a query and routes each packet.
///
/// One packet per iteration: read the one-byte discriminator, decode the
/// payload for that kind, hand the result to the [`PacketHandler`], and
/// go again until a terminal packet or an error.
///
/// ```text
///   ┌──────────────┐  Data/Totals/Extremes ──▶ on_data
///   │ read 1 byte  │  Log                  ──▶ on_logs
///   │ discriminator├─▶Progress             ──▶ on_progress (+ debug trace)
///   └──────▲───────┘  ProfileEvents        ──▶ on_profile_events
///          │          ProfileInfo          ──▶ debug trace only
///          │          TableColumns         ──▶ debug trace only
///          └──────────┘
///                     EndOfStream          ──▶ Ok
///                     Exception            ──▶ Err(Server)
///                     anything else        ──▶ Err(UnexpectedPacket)
/// ```
///
/// Calls take `&mut self`, so two loops can never interleave on one
/// connection. The dispatcher never reads past the packet that ended the
/// loop; a later call resumes at the next packet.
#[derive(Debug)]
pub struct ResponseReader<R> {
    reader: ProtoReader<R>,
    config: DecoderConfig,
}

impl<R: Read> ResponseReader<R> {
    /// A dispatcher with [`DecoderConfig::default`].
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, DecoderConfig::default())
    }

    pub fn with_config(inner: R, config: DecoderConfig) -> Self {
        Self {
            reader: ProtoReader::new(inner),
            config,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Bytes consumed from the transport so far.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    /// Run the response to completion.
    ///
    /// Returns `Ok(())` on EndOfStream. Every Data, Totals and Extremes
    /// block goes to [`PacketHandler::on_data`].
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Server`] if the server reports an exception.
    /// - [`DecodeError::EndOfInput`] if the transport closes at a packet
    ///   boundary before EndOfStream.
    /// - [`DecodeError::Transport`] for any other I/O failure.
    /// - [`DecodeError::Payload`] for a malformed packet body.
    /// - [`DecodeError::UnexpectedPacket`] for an unknown discriminator.
    pub fn process<H: PacketHandler + ?Sized>(&mut self, handler: &mut H) -> Result<(), DecodeError> {
        self.run(StopAt::EndOfStream, handler).map(|_| ())
    }

    /// Read until the first Data packet and return its block.
    ///
    /// The block is returned to the caller, not passed to `on_data`.
    /// Packets that arrive before it are routed exactly as in
    /// [`process`](Self::process), Totals and Extremes included. The
    /// rest of the response stays unread.
    ///
    /// # Errors
    ///
    /// As [`process`](Self::process); in addition, EndOfStream before
    /// any Data packet is [`DecodeError::EndOfInput`].
    pub fn first_block<H: PacketHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<Block, DecodeError> {
        self.run(StopAt::FirstBlock, handler)?
            .ok_or(DecodeError::EndOfInput)
    }

    fn run<H: PacketHandler + ?Sized>(
        &mut self,
        stop: StopAt,
        handler: &mut H,
    ) -> Result<Option<Block>, DecodeError> {
        loop {
            let offset = self.reader.offset();
            let kind = self.read_kind()?;
            trace!(packet = %kind, offset, "read packet");

            match kind {
                PacketKind::EndOfStream => {
                    debug!("[end of stream]");
                    return Ok(None);
                }
                PacketKind::Data | PacketKind::Totals | PacketKind::Extremes => {
                    let block = self.decode(kind, |r, config| payload::read_block(r, config, kind))?;
                    if kind == PacketKind::Data && stop == StopAt::FirstBlock {
                        return Ok(Some(block));
                    }
                    handler.on_data(block);
                }
                PacketKind::Exception => {
                    let exception = self.decode(kind, |r, _| payload::read_exception(r))?;
                    debug!(code = exception.code, "[exception] {}", exception.message);
                    return Err(DecodeError::Server(exception));
                }
                PacketKind::ProfileInfo => {
                    let info = self.decode(kind, payload::read_profile_info)?;
                    debug!("[profile info] {info}");
                }
                PacketKind::TableColumns => {
                    let columns = self.decode(kind, |r, _| payload::read_table_columns(r))?;
                    debug!(table = %columns.table_name, "[table columns]");
                }
                PacketKind::ProfileEvents => {
                    let events = self.decode(kind, payload::read_profile_events)?;
                    handler.on_profile_events(events);
                }
                PacketKind::Log => {
                    let logs = self.decode(kind, payload::read_logs)?;
                    handler.on_logs(logs);
                }
                PacketKind::Progress => {
                    let progress = self.decode(kind, payload::read_progress)?;
                    debug!("[progress] {progress}");
                    handler.on_progress(progress);
                }
                PacketKind::Unknown(packet) => {
                    return Err(DecodeError::UnexpectedPacket {
                        op: stop.operation(),
                        packet,
                    });
                }
            }
        }
    }

    /// Read a discriminator. A clean close here is the end of input, not
    /// a transport failure.
    fn read_kind(&mut self) -> Result<PacketKind, DecodeError> {
        match self.reader.read_byte() {
            Ok(byte) => Ok(PacketKind::from_wire_id(byte)),
            Err(WireError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(DecodeError::EndOfInput)
            }
            Err(WireError::Io(e)) => Err(DecodeError::Transport(e)),
            Err(other) => Err(DecodeError::Transport(io::Error::other(other))),
        }
    }

    fn decode<T>(
        &mut self,
        kind: PacketKind,
        read: impl FnOnce(&mut ProtoReader<R>, &DecoderConfig) -> Result<T, TypeError>,
    ) -> Result<T, DecodeError> {
        read(&mut self.reader, &self.config).map_err(|e| DecodeError::from_payload(kind, e))
    }
}
