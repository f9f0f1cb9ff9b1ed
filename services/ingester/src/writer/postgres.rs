//! Time-series bulk-copy writer (spec §4.9).
//!
//! `write_batch` opens one transaction and performs three `COPY FROM STDIN`
//! streams in order (`ticks`, `vdf_proofs`, `tick_transactions`); the
//! transaction commits atomically, so either all three sub-streams land or
//! none does.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{WriteError, Writer};
use sequencer_proto::Tick;

pub struct PostgresWriter {
    pool: PgPool,
}

impl PostgresWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Writer for PostgresWriter {
    async fn write_batch(&self, ticks: &[Tick]) -> Result<(), WriteError> {
        if ticks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(step("begin"))?;

        {
            let mut copy = tx
                .copy_in_raw("COPY ticks (tick_number, timestamp, batch_hash) FROM STDIN WITH (FORMAT csv)")
                .await
                .map_err(step("ticks: open copy"))?;
            let mut buf = String::new();
            for tick in ticks {
                buf.push_str(&tick.tick_number.to_string());
                buf.push(',');
                push_csv_field(&mut buf, &tick.timestamp.to_rfc3339());
                buf.push(',');
                push_csv_field(&mut buf, &tick.batch_hash);
                buf.push('\n');
            }
            copy.send(buf.as_bytes())
                .await
                .map_err(step("ticks: send"))?;
            copy.finish().await.map_err(step("ticks: finish"))?;
        }

        {
            let mut copy = tx
                .copy_in_raw(
                    "COPY vdf_proofs (tick_number, input, output, proof, iterations) FROM STDIN WITH (FORMAT csv)",
                )
                .await
                .map_err(step("vdf_proofs: open copy"))?;
            let mut buf = String::new();
            for tick in ticks {
                buf.push_str(&tick.tick_number.to_string());
                buf.push(',');
                push_csv_field(&mut buf, &tick.vdf_proof.input);
                buf.push(',');
                push_csv_field(&mut buf, &tick.vdf_proof.output);
                buf.push(',');
                push_csv_field(&mut buf, &tick.vdf_proof.proof);
                buf.push(',');
                buf.push_str(&tick.vdf_proof.iterations.to_string());
                buf.push('\n');
            }
            copy.send(buf.as_bytes())
                .await
                .map_err(step("vdf_proofs: send"))?;
            copy.finish().await.map_err(step("vdf_proofs: finish"))?;
        }

        {
            let mut copy = tx
                .copy_in_raw(
                    "COPY tick_transactions (tx_hash, tx_id, tick_number, sequence_number, \
                     payload, signature, public_key, nonce, timestamp, tick_timestamp) \
                     FROM STDIN WITH (FORMAT csv)",
                )
                .await
                .map_err(step("tick_transactions: open copy"))?;
            let mut buf = String::new();
            for tick in ticks {
                let tick_timestamp = tick.timestamp.to_rfc3339();
                for transaction in &tick.transactions {
                    push_csv_field(&mut buf, &hex::encode(&transaction.tx_hash));
                    buf.push(',');
                    push_csv_field(&mut buf, &transaction.tx_id);
                    buf.push(',');
                    buf.push_str(&tick.tick_number.to_string());
                    buf.push(',');
                    buf.push_str(&transaction.sequence_number.to_string());
                    buf.push(',');
                    push_csv_field(&mut buf, &bytea_literal(&transaction.payload));
                    buf.push(',');
                    push_csv_field(&mut buf, &bytea_literal(&transaction.signature));
                    buf.push(',');
                    push_csv_field(&mut buf, &bytea_literal(&transaction.public_key));
                    buf.push(',');
                    buf.push_str(&transaction.nonce.to_string());
                    buf.push(',');
                    push_csv_field(&mut buf, &transaction.client_timestamp.to_rfc3339());
                    buf.push(',');
                    push_csv_field(&mut buf, &tick_timestamp);
                    buf.push('\n');
                }
            }
            copy.send(buf.as_bytes())
                .await
                .map_err(step("tick_transactions: send"))?;
            copy.finish()
                .await
                .map_err(step("tick_transactions: finish"))?;
        }

        tx.commit().await.map_err(step("commit"))?;
        Ok(())
    }
}

fn step(name: &'static str) -> impl Fn(sqlx::Error) -> WriteError {
    move |e| WriteError::Step {
        step: name,
        source: Box::new(e),
    }
}

/// Postgres `bytea` text/COPY-CSV representation (hex format, the server default).
fn bytea_literal(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

fn push_csv_field(buf: &mut String, field: &str) {
    buf.push('"');
    for c in field.chars() {
        if c == '"' {
            buf.push('"');
        }
        buf.push(c);
    }
    buf.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_field_escapes_embedded_quotes() {
        let mut buf = String::new();
        push_csv_field(&mut buf, "he said \"hi\"");
        assert_eq!(buf, "\"he said \"\"hi\"\"\"");
    }

    #[test]
    fn bytea_literal_uses_hex_escape_format() {
        assert_eq!(bytea_literal(&[0xde, 0xad]), "\\xdead");
    }
}
