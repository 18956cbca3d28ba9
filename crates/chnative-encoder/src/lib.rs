#![warn(clippy::pedantic)]

//! Builds byte-exact ClickHouse server responses.
//!
//! Nothing in a client sends these packets; the encoder exists so that
//! tests, benches, fuzz seeds and the CLI's fixtures can describe a
//! response as a list of typed packets instead of hand-assembled bytes.

pub mod compression;
pub mod encoder;
pub mod error;

pub use encoder::ResponseEncoder;
pub use error::EncodeError;
