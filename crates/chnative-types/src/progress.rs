use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use chnative_wire::packet::revision;
use chnative_wire::{ProtoReader, ProtoWriter};

use crate::error::TypeError;

/// Execution counters the server reports while a query runs.
///
/// Each Progress packet carries the *delta* since the previous one; use
/// [`merge`](Self::merge) to keep a running total.
///
/// ```text
/// ┌───────────────┬─────────┬───────────────────┐
/// │ Field         │ Wire    │ Present from      │
/// ├───────────────┼─────────┼───────────────────┤
/// │ rows          │ uvarint │ always            │
/// │ bytes         │ uvarint │ always            │
/// │ total_rows    │ uvarint │ revision 51554    │
/// │ written_rows  │ uvarint │ revision 54420    │
/// │ written_bytes │ uvarint │ revision 54420    │
/// │ elapsed_ns    │ uvarint │ revision 54460    │
/// └───────────────┴─────────┴───────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub rows: u64,
    pub bytes: u64,
    pub total_rows: u64,
    pub written_rows: u64,
    pub written_bytes: u64,
    pub elapsed_ns: u64,
}

impl Progress {
    pub fn decode<R: Read>(r: &mut ProtoReader<R>, revision: u64) -> Result<Self, TypeError> {
        let mut progress = Self {
            rows: r.read_uvarint()?,
            bytes: r.read_uvarint()?,
            ..Self::default()
        };
        if revision >= revision::WITH_TOTAL_ROWS_IN_PROGRESS {
            progress.total_rows = r.read_uvarint()?;
        }
        if revision >= revision::WITH_CLIENT_WRITE_INFO {
            progress.written_rows = r.read_uvarint()?;
            progress.written_bytes = r.read_uvarint()?;
        }
        if revision >= revision::WITH_SERVER_QUERY_TIME_IN_PROGRESS {
            progress.elapsed_ns = r.read_uvarint()?;
        }
        Ok(progress)
    }

    pub fn encode<W: Write>(&self, w: &mut ProtoWriter<W>, revision: u64) -> Result<(), TypeError> {
        w.write_uvarint(self.rows)?;
        w.write_uvarint(self.bytes)?;
        if revision >= revision::WITH_TOTAL_ROWS_IN_PROGRESS {
            w.write_uvarint(self.total_rows)?;
        }
        if revision >= revision::WITH_CLIENT_WRITE_INFO {
            w.write_uvarint(self.written_rows)?;
            w.write_uvarint(self.written_bytes)?;
        }
        if revision >= revision::WITH_SERVER_QUERY_TIME_IN_PROGRESS {
            w.write_uvarint(self.elapsed_ns)?;
        }
        Ok(())
    }

    /// Fold another delta into this running total.
    ///
    /// `total_rows` is an estimate the server revises upward, so the
    /// larger value wins. `elapsed_ns` is a wall-clock reading, so the
    /// latest (largest) value wins as well.
    pub fn merge(&mut self, delta: &Self) {
        self.rows = self.rows.saturating_add(delta.rows);
        self.bytes = self.bytes.saturating_add(delta.bytes);
        self.total_rows = self.total_rows.max(delta.total_rows);
        self.written_rows = self.written_rows.saturating_add(delta.written_rows);
        self.written_bytes = self.written_bytes.saturating_add(delta.written_bytes);
        self.elapsed_ns = self.elapsed_ns.max(delta.elapsed_ns);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={}, bytes={}, total rows={}, wrote rows={}, wrote bytes={}, elapsed={:?}",
            self.rows,
            self.bytes,
            self.total_rows,
            self.written_rows,
            self.written_bytes,
            self.elapsed()
        )
    }
}
