/// Implementation of `chnative validate`.
///
/// Runs the whole response through the dispatcher and reports which of
/// the possible endings it reached. Only a clean EndOfStream is valid.
///
/// # Success output
///
/// ```text
/// ✓ EndOfStream at offset 66012
/// ✓ Data: 3 blocks, 8193 rows
/// ✓ Side channels: 2 progress packets, 4 log entries, 12 profile events
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Server exception: code: 60, message: Table default.t doesn't exist
/// ```
///
/// ```text
/// ┌───────────────────────┬───────────────────────────────────────────┐
/// │ Ending                │ Report                                    │
/// ├───────────────────────┼───────────────────────────────────────────┤
/// │ EndOfStream           │ ✓ lines, exit 0                           │
/// │ Exception packet      │ ✗ Server exception, exit 1                │
/// │ EOF at packet start   │ ✗ End of input before EndOfStream, exit 1 │
/// │ unknown discriminator │ ✗ Protocol violation, exit 1              │
/// │ malformed payload     │ ✗ Decode error, exit 1                    │
/// │ other I/O failure     │ ✗ Transport error, exit 1                 │
/// └───────────────────────┴───────────────────────────────────────────┘
/// ```
use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result, anyhow};
use chnative_decoder::{DecodeError, DecoderConfig, QueryCollector, ResponseReader};

use crate::ValidateArgs;

/// Run the `chnative validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the response ends
/// any way other than EndOfStream.
pub fn run(args: &ValidateArgs, config: DecoderConfig) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let mut reader = ResponseReader::with_config(BufReader::new(file), config);
    let mut collected = QueryCollector::new();

    match reader.process(&mut collected) {
        Ok(()) => {
            println!("✓ EndOfStream at offset {}", reader.offset());
            println!(
                "✓ Data: {} block{}, {} row{}",
                collected.blocks.len(),
                plural(collected.blocks.len()),
                collected.rows(),
                plural(collected.rows())
            );
            println!(
                "✓ Side channels: {} progress packet{}, {} log entr{}, {} profile event{}",
                collected.progress_packets,
                plural(collected.progress_packets),
                collected.logs.len(),
                if collected.logs.len() == 1 { "y" } else { "ies" },
                collected.profile_events.len(),
                plural(collected.profile_events.len())
            );
            Ok(())
        }
        Err(e) => {
            println!("✗ {}", diagnostic(&e, reader.offset()));
            Err(anyhow!("validation failed"))
        }
    }
}

fn diagnostic(err: &DecodeError, offset: u64) -> String {
    match err {
        DecodeError::Server(exception) => {
            let mut line = format!("Server exception: {exception}");
            for nested in exception.chain().skip(1) {
                line.push_str(&format!("\n  caused by: {nested}"));
            }
            line
        }
        DecodeError::EndOfInput => format!("End of input before EndOfStream (offset {offset})"),
        DecodeError::Transport(e) => format!("Transport error at offset {offset}: {e}"),
        DecodeError::UnexpectedPacket { .. } => {
            format!("Protocol violation at offset {offset}: {err}")
        }
        DecodeError::Payload { .. } => {
            let mut line = format!("Decode error at offset {offset}: {err}");
            let mut source = std::error::Error::source(err);
            while let Some(cause) = source {
                line.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            line
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
