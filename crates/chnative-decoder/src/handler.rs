use std::fmt;
use std::sync::mpsc::Sender;

use chnative_types::{Block, LogEntry, ProfileEvent, Progress};

/// Consumer of the events a running query produces.
///
/// The dispatcher calls these inline, in the order the packets arrive.
/// Every method defaults to doing nothing, so a handler implements only
/// what it cares about; an event with no interested handler is decoded
/// and dropped.
///
/// ```text
/// ┌────────────────────────┬─────────────────────┐
/// │ Packet kind            │ Method              │
/// ├────────────────────────┼─────────────────────┤
/// │ Data, Totals, Extremes │ on_data             │
/// │ Log                    │ on_logs             │
/// │ Progress               │ on_progress         │
/// │ ProfileEvents          │ on_profile_events   │
/// └────────────────────────┴─────────────────────┘
/// ```
///
/// Handlers run on the reading thread and block it. Anything slow
/// belongs on another thread; see [`EventChannel`].
pub trait PacketHandler {
    fn on_data(&mut self, _block: Block) {}

    fn on_logs(&mut self, _logs: Vec<LogEntry>) {}

    fn on_progress(&mut self, _progress: Progress) {}

    fn on_profile_events(&mut self, _events: Vec<ProfileEvent>) {}
}

/// Ignore everything.
impl PacketHandler for () {}

impl<H: PacketHandler + ?Sized> PacketHandler for &mut H {
    fn on_data(&mut self, block: Block) {
        (**self).on_data(block);
    }

    fn on_logs(&mut self, logs: Vec<LogEntry>) {
        (**self).on_logs(logs);
    }

    fn on_progress(&mut self, progress: Progress) {
        (**self).on_progress(progress);
    }

    fn on_profile_events(&mut self, events: Vec<ProfileEvent>) {
        (**self).on_profile_events(events);
    }
}

// ── CallbackSet ─────────────────────────────────────────────────────────

type Callback<'a, T> = Option<Box<dyn FnMut(T) + 'a>>;

/// Four independently optional closures.
///
/// An unset closure is never called.
///
/// ```rust
/// use chnative_decoder::CallbackSet;
///
/// let mut rows = 0;
/// let callbacks = CallbackSet::new().with_progress(|p| rows += p.rows);
/// # drop(callbacks);
/// ```
#[derive(Default)]
pub struct CallbackSet<'a> {
    data: Callback<'a, Block>,
    logs: Callback<'a, Vec<LogEntry>>,
    progress: Callback<'a, Progress>,
    profile_events: Callback<'a, Vec<ProfileEvent>>,
}

impl<'a> CallbackSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data(mut self, f: impl FnMut(Block) + 'a) -> Self {
        self.data = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_logs(mut self, f: impl FnMut(Vec<LogEntry>) + 'a) -> Self {
        self.logs = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_progress(mut self, f: impl FnMut(Progress) + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_profile_events(mut self, f: impl FnMut(Vec<ProfileEvent>) + 'a) -> Self {
        self.profile_events = Some(Box::new(f));
        self
    }
}

impl PacketHandler for CallbackSet<'_> {
    fn on_data(&mut self, block: Block) {
        if let Some(f) = &mut self.data {
            f(block);
        }
    }

    fn on_logs(&mut self, logs: Vec<LogEntry>) {
        if let Some(f) = &mut self.logs {
            f(logs);
        }
    }

    fn on_progress(&mut self, progress: Progress) {
        if let Some(f) = &mut self.progress {
            f(progress);
        }
    }

    fn on_profile_events(&mut self, events: Vec<ProfileEvent>) {
        if let Some(f) = &mut self.profile_events {
            f(events);
        }
    }
}

impl fmt::Debug for CallbackSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSet")
            .field("data", &self.data.is_some())
            .field("logs", &self.logs.is_some())
            .field("progress", &self.progress.is_some())
            .field("profile_events", &self.profile_events.is_some())
            .finish()
    }
}

// ── ServerEvent ─────────────────────────────────────────────────────────

/// One routed event, as a value.
///
/// Lets a caller collect events ([`Vec<ServerEvent>`]) or ship them to
/// another thread ([`EventChannel`]) and filter there.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    Data(Block),
    Logs(Vec<LogEntry>),
    Progress(Progress),
    ProfileEvents(Vec<ProfileEvent>),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Logs(_) => "logs",
            Self::Progress(_) => "progress",
            Self::ProfileEvents(_) => "profile events",
        }
    }
}

/// Records every event in receipt order.
impl PacketHandler for Vec<ServerEvent> {
    fn on_data(&mut self, block: Block) {
        self.push(ServerEvent::Data(block));
    }

    fn on_logs(&mut self, logs: Vec<LogEntry>) {
        self.push(ServerEvent::Logs(logs));
    }

    fn on_progress(&mut self, progress: Progress) {
        self.push(ServerEvent::Progress(progress));
    }

    fn on_profile_events(&mut self, events: Vec<ProfileEvent>) {
        self.push(ServerEvent::ProfileEvents(events));
    }
}

// ── EventChannel ────────────────────────────────────────────────────────

/// Hands every event to another thread.
///
/// The dispatcher itself never drops an event: each one reaches the
/// handler. What this handler does when the receiving side has gone away
/// is its own policy: the event is counted, logged at `warn`, and
/// reading continues, so the query still runs to its terminal packet.
/// Callers that must not lose events check [`dropped`](Self::dropped)
/// after the call returns.
#[derive(Debug)]
pub struct EventChannel {
    tx: Sender<ServerEvent>,
    dropped: usize,
}

impl EventChannel {
    pub fn new(tx: Sender<ServerEvent>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Events that could not be delivered because the receiver was gone.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_disconnected(&self) -> bool {
        self.dropped > 0
    }

    pub fn into_inner(self) -> Sender<ServerEvent> {
        self.tx
    }

    fn send(&mut self, event: ServerEvent) {
        if let Err(err) = self.tx.send(event) {
            self.dropped += 1;
            tracing::warn!(event = err.0.name(), "event receiver disconnected, dropping event");
        }
    }
}

impl PacketHandler for EventChannel {
    fn on_data(&mut self, block: Block) {
        self.send(ServerEvent::Data(block));
    }

    fn on_logs(&mut self, logs: Vec<LogEntry>) {
        self.send(ServerEvent::Logs(logs));
    }

    fn on_progress(&mut self, progress: Progress) {
        self.send(ServerEvent::Progress(progress));
    }

    fn on_profile_events(&mut self, events: Vec<ProfileEvent>) {
        self.send(ServerEvent::ProfileEvents(events));
    }
}

// ── QueryCollector ──────────────────────────────────────────────────────

/// Gathers a whole response in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryCollector {
    /// Data, Totals and Extremes blocks, in receipt order.
    pub blocks: Vec<Block>,
    /// Sum of every Progress packet.
    pub progress: Progress,
    pub progress_packets: usize,
    pub logs: Vec<LogEntry>,
    pub profile_events: Vec<ProfileEvent>,
}

impl QueryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows across all collected blocks.
    pub fn rows(&self) -> usize {
        self.blocks.iter().map(|b| b.num_rows).sum()
    }
}

impl PacketHandler for QueryCollector {
    fn on_data(&mut self, block: Block) {
        self.blocks.push(block);
    }

    fn on_logs(&mut self, logs: Vec<LogEntry>) {
        self.logs.extend(logs);
    }

    fn on_progress(&mut self, progress: Progress) {
        self.progress.merge(&progress);
        self.progress_packets += 1;
    }

    fn on_profile_events(&mut self, events: Vec<ProfileEvent>) {
        self.profile_events.extend(events);
    }
}
