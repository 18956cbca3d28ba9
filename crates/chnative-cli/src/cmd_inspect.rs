/// Implementation of `chnative inspect`.
///
/// Feeds a captured response through the dispatcher and prints each
/// routed event as it arrives. ProfileInfo and TableColumns packets are
/// not routed to handlers; run with `-v` to see their debug traces.
///
/// # Output format
///
/// ```text
/// progress: rows=8192, bytes=65536, total rows=0, wrote rows=0, wrote bytes=0, elapsed=1.2ms
/// data: 2 columns, 8192 rows (number UInt64, name String)
/// logs: 1 entry
///   [Information] executeQuery: Read 8192 rows
/// profile events: 2
///   SelectedRows increment 8192
///   MemoryTrackerUsage gauge 4096
/// ---
/// end of stream at offset 66012
/// ```
///
/// With `--json`, every event is one object on its own line, tagged by
/// `"event"`.
use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use chnative_decoder::{DecoderConfig, PacketHandler, ResponseReader};
use chnative_types::{Block, LogEntry, ProfileEvent, Progress};
use serde::Serialize;

use crate::InspectArgs;

/// Run the `chnative inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the response does not
/// end with EndOfStream (or, with `--first-block`, with a Data packet).
pub fn run(args: &InspectArgs, config: DecoderConfig) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let mut reader = ResponseReader::with_config(BufReader::new(file), config);
    let mut printer = Printer { json: args.json };

    if args.first_block {
        let block = reader
            .first_block(&mut printer)
            .with_context(|| format!("no first block in {}", args.file.display()))?;
        printer.emit(&Event::FirstBlock(BlockSummary::of(&block)));
    } else {
        reader
            .process(&mut printer)
            .with_context(|| format!("failed to process {}", args.file.display()))?;
    }

    if !args.json {
        println!("---");
        let end = if args.first_block { "first block" } else { "end of stream" };
        println!("{end} at offset {}", reader.offset());
    }
    Ok(())
}

struct Printer {
    json: bool,
}

impl Printer {
    fn emit(&self, event: &Event<'_>) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("error: cannot serialize event: {e}"),
            }
        } else {
            print_text(event);
        }
    }
}

impl PacketHandler for Printer {
    fn on_data(&mut self, block: Block) {
        self.emit(&Event::Data(BlockSummary::of(&block)));
    }

    fn on_logs(&mut self, logs: Vec<LogEntry>) {
        self.emit(&Event::Logs {
            entries: logs.iter().map(LogLine::of).collect(),
        });
    }

    fn on_progress(&mut self, progress: Progress) {
        self.emit(&Event::Progress(ProgressLine::of(&progress)));
    }

    fn on_profile_events(&mut self, events: Vec<ProfileEvent>) {
        self.emit(&Event::ProfileEvents {
            counters: events.iter().map(CounterLine::of).collect(),
        });
    }
}

// ── Printable events ──────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Data(BlockSummary),
    FirstBlock(BlockSummary),
    Logs { entries: Vec<LogLine<'a>> },
    Progress(ProgressLine),
    ProfileEvents { counters: Vec<CounterLine<'a>> },
}

#[derive(Serialize)]
struct BlockSummary {
    rows: usize,
    columns: Vec<(String, String)>,
}

impl BlockSummary {
    fn of(block: &Block) -> Self {
        Self {
            rows: block.num_rows,
            columns: block
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.type_name.clone()))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct LogLine<'a> {
    level: &'static str,
    source: &'a str,
    text: &'a str,
}

impl<'a> LogLine<'a> {
    fn of(entry: &'a LogEntry) -> Self {
        Self {
            level: entry.level(),
            source: &entry.source,
            text: &entry.text,
        }
    }
}

#[derive(Serialize)]
struct ProgressLine {
    rows: u64,
    bytes: u64,
    total_rows: u64,
    written_rows: u64,
    written_bytes: u64,
    elapsed_ns: u64,
    #[serde(skip)]
    display: String,
}

impl ProgressLine {
    fn of(progress: &Progress) -> Self {
        Self {
            rows: progress.rows,
            bytes: progress.bytes,
            total_rows: progress.total_rows,
            written_rows: progress.written_rows,
            written_bytes: progress.written_bytes,
            elapsed_ns: progress.elapsed_ns,
            display: progress.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CounterLine<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: String,
    value: i64,
}

impl<'a> CounterLine<'a> {
    fn of(event: &'a ProfileEvent) -> Self {
        Self {
            name: &event.name,
            kind: event.event_type.to_string(),
            value: event.value,
        }
    }
}

fn print_text(event: &Event<'_>) {
    match event {
        Event::Data(block) => println!("data: {}", describe_block(block)),
        Event::FirstBlock(block) => println!("first block: {}", describe_block(block)),
        Event::Logs { entries } => {
            let noun = if entries.len() == 1 { "entry" } else { "entries" };
            println!("logs: {} {noun}", entries.len());
            for line in entries {
                println!("  [{}] {}: {}", line.level, line.source, line.text);
            }
        }
        Event::Progress(progress) => println!("progress: {}", progress.display),
        Event::ProfileEvents { counters } => {
            println!("profile events: {}", counters.len());
            for counter in counters {
                println!("  {} {} {}", counter.name, counter.kind, counter.value);
            }
        }
    }
}

fn describe_block(block: &BlockSummary) -> String {
    let columns: Vec<String> = block
        .columns
        .iter()
        .map(|(name, ty)| format!("{name} {ty}"))
        .collect();
    format!(
        "{} column{}, {} row{} ({})",
        columns.len(),
        if columns.len() == 1 { "" } else { "s" },
        block.rows,
        if block.rows == 1 { "" } else { "s" },
        columns.join(", ")
    )
}
