//! Debug console emitter (spec §4.10): three formats, writes serialised by
//! an internal mutex, stops at the first per-tick failure.

use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;

use super::{WriteError, Writer};
use crate::config::OutputFormat;
use sequencer_proto::Tick;

pub struct ConsoleWriter {
    format: OutputFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            out: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    #[cfg(test)]
    fn with_sink(format: OutputFormat, sink: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            out: Mutex::new(sink),
        }
    }

    fn write_tick(&self, out: &mut dyn Write, tick: &Tick) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(tick)?;
                writeln!(out, "{json}")
            }
            OutputFormat::Compact => {
                writeln!(
                    out,
                    "tick={} txs={} batch_hash={}",
                    tick.tick_number,
                    tick.transactions.len(),
                    tick.batch_hash
                )
            }
            OutputFormat::Table => {
                writeln!(out, "+{:-<60}+", "")?;
                writeln!(out, "| tick_number   | {:<44} |", tick.tick_number)?;
                writeln!(out, "| timestamp     | {:<44} |", tick.timestamp.to_rfc3339())?;
                writeln!(out, "| batch_hash    | {:<44} |", truncate(&tick.batch_hash, 32))?;
                writeln!(
                    out,
                    "| vdf_proof.out | {:<44} |",
                    truncate(&tick.vdf_proof.output, 32)
                )?;
                writeln!(out, "| transactions  | {:<44} |", tick.transactions.len())?;
                writeln!(out, "+{:-<60}+", "")
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_owned()
    } else {
        format!("{}...", &s[..max])
    }
}

#[async_trait]
impl Writer for ConsoleWriter {
    async fn write_batch(&self, ticks: &[Tick]) -> Result<(), WriteError> {
        if ticks.is_empty() {
            return Ok(());
        }
        let mut out = self.out.lock().expect("console writer mutex poisoned");
        for tick in ticks {
            self.write_tick(&mut *out, tick).map_err(|e| WriteError::Step {
                step: "console write",
                source: Box::new(e),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sequencer_proto::VdfProof;

    fn sample_tick(n: u64) -> Tick {
        Tick {
            tick_number: n,
            timestamp: Utc::now(),
            vdf_proof: VdfProof {
                input: "in".into(),
                output: "out".into(),
                proof: "proof".into(),
                iterations: 1,
            },
            batch_hash: "hash".into(),
            previous_output: String::new(),
            transactions: vec![],
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn compact_format_writes_one_line_per_tick() {
        let buf: Vec<u8> = Vec::new();
        let writer = ConsoleWriter::with_sink(OutputFormat::Compact, Box::new(buf));
        writer.write_batch(&[sample_tick(1), sample_tick(2)]).await.unwrap();
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let writer = ConsoleWriter::new(OutputFormat::Json);
        writer.write_batch(&[]).await.unwrap();
    }
}
