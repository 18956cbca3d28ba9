use std::fmt;
use std::io;

use chnative_types::{PacketKind, ServerException, TypeError};
use chnative_wire::CompressionMethod;

/// Which dispatcher entry point was running when an error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Process,
    FirstBlock,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Process => "process",
            Self::FirstBlock => "first_block",
        })
    }
}

/// Ways a response can end other than a clean EndOfStream.
///
/// The dispatcher never retries and never guesses: each variant tells
/// the caller exactly how the exchange ended, so it can decide whether
/// the connection is still usable.
///
/// ```text
///   DecodeError
///   ├── EndOfInput        ← transport closed at a packet boundary, or
///   │                       EndOfStream before any block (first_block)
///   ├── Transport         ← I/O failure, passed through unchanged
///   ├── Payload           ← a recognized packet with a malformed body
///   ├── Server            ← the server sent an Exception packet
///   └── UnexpectedPacket  ← discriminator outside the query response set
/// ```
///
/// Only `Server` leaves the connection in a known state; after any other
/// error the stream position is undefined.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("end of input")]
    EndOfInput,

    #[error(transparent)]
    Transport(io::Error),

    #[error("malformed {packet} packet")]
    Payload {
        packet: PacketKind,
        source: PayloadError,
    },

    #[error(transparent)]
    Server(ServerException),

    #[error("[{op}]: unexpected packet {packet}")]
    UnexpectedPacket { op: Operation, packet: u8 },
}

impl DecodeError {
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Self::EndOfInput)
    }

    pub fn is_server_exception(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// A discriminator with no place in a query response.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::UnexpectedPacket { .. })
    }

    /// A recognized packet whose payload could not be decoded.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Payload { .. })
    }

    pub fn server_exception(&self) -> Option<&ServerException> {
        match self {
            Self::Server(e) => Some(e),
            _ => None,
        }
    }

    /// Sort a payload decoder's failure into transport vs. payload.
    ///
    /// I/O errors, including EOF partway through a payload, surface as
    /// [`Transport`](Self::Transport) with the original `io::Error`.
    /// Compression failures travel inside `io::Error` through the frame
    /// reader and are unwrapped back into [`PayloadError::Compression`].
    pub(crate) fn from_payload(packet: PacketKind, err: TypeError) -> Self {
        match err.into_io() {
            Ok(io) => match take_compression_error(io) {
                Ok(compression) => Self::Payload {
                    packet,
                    source: PayloadError::Compression(compression),
                },
                Err(io) => Self::Transport(io),
            },
            Err(err) => Self::Payload {
                packet,
                source: PayloadError::Type(err),
            },
        }
    }
}

fn take_compression_error(io: io::Error) -> Result<CompressionError, io::Error> {
    if !io.get_ref().is_some_and(|e| e.is::<CompressionError>()) {
        return Err(io);
    }
    let kind = io.kind();
    match io.into_inner() {
        Some(inner) => inner
            .downcast::<CompressionError>()
            .map(|e| *e)
            .map_err(|other| io::Error::new(kind, other)),
        None => Err(io::Error::from(kind)),
    }
}

/// Why a recognized packet's payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Compression(#[from] CompressionError),
}

/// Failures inside the compressed frame envelope.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("{0:?} compression is not supported")]
    UnsupportedMethod(CompressionMethod),

    #[error("invalid compressed frame: {0}")]
    Frame(chnative_wire::WireError),

    #[error("zstd decompression failed: {0}")]
    DecompressFailed(String),

    /// Rejected on the declared size, before decompressing.
    #[error("decompressed size {actual} exceeds limit {limit}")]
    DecompressionBomb { actual: usize, limit: usize },

    #[error("frame decompressed to {actual} bytes, header declared {declared}")]
    SizeMismatch { declared: usize, actual: usize },
}

impl From<CompressionError> for io::Error {
    fn from(err: CompressionError) -> Self {
        io::Error::other(err)
    }
}
