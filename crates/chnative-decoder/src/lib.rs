#![warn(clippy::pedantic)]

//! Server-response demultiplexer for the ClickHouse native protocol.
//!
//! After a query is sent, the server answers with a stream of typed
//! packets: result blocks, progress counters, log lines, profiling
//! counters, and finally EndOfStream or an Exception. [`ResponseReader`]
//! reads that stream one packet at a time and routes each decoded
//! payload to a [`PacketHandler`].
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use chnative_decoder::{QueryCollector, ResponseReader};
//!
//! // Progress (all zero), then EndOfStream.
//! let response = vec![0x03, 0, 0, 0, 0, 0, 0, 0x05];
//! let mut collector = QueryCollector::new();
//! ResponseReader::new(Cursor::new(response)).process(&mut collector).unwrap();
//! assert_eq!(collector.progress_packets, 1);
//! ```

pub mod compression;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;

mod payload;

pub use config::DecoderConfig;
pub use dispatcher::ResponseReader;
pub use error::{CompressionError, DecodeError, Operation, PayloadError};
pub use handler::{CallbackSet, EventChannel, PacketHandler, QueryCollector, ServerEvent};
