//! Stateless wire-to-domain transformation (spec §4.7).
//!
//! Pure and safe for concurrent use: every call only reads its argument and
//! the wall clock, and allocates a fresh [`sequencer_proto::Tick`].

use chrono::{DateTime, TimeZone, Utc};
use sequencer_proto::pb::Tick as WireTick;
use sequencer_proto::{DomainError, Tick, Transaction, VdfProof};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("nil {0}")]
    Nil(&'static str),
    #[error("{0}")]
    Invalid(#[from] DomainError),
}

/// Converts one wire tick into a validated domain tick.
///
/// `vdf_proof` absence on the wire is represented by prost as the zero
/// value (an all-empty `VdfProof`), which then fails the domain
/// validation with a more specific error; the explicit check here exists
/// only to produce the "nil vdf_proof" wording spec.md calls for.
pub fn parse_tick(wire: WireTick) -> Result<Tick, ParseError> {
    let vdf_proof = wire.vdf_proof.ok_or(ParseError::Nil("vdf_proof"))?;
    let vdf_proof = VdfProof {
        input: hex::encode(vdf_proof.input),
        output: hex::encode(vdf_proof.output),
        proof: hex::encode(vdf_proof.proof),
        iterations: vdf_proof.iterations,
    };

    let mut transactions = Vec::with_capacity(wire.transactions.len());
    for wire_tx in wire.transactions {
        transactions.push(parse_transaction(wire_tx)?);
    }

    let received_at = Utc::now();
    let tick = Tick {
        tick_number: wire.tick_number,
        timestamp: micros_to_datetime(wire.timestamp_micros),
        vdf_proof,
        batch_hash: wire.transaction_batch_hash,
        previous_output: wire.previous_output,
        transactions,
        received_at,
    };

    tick.validate()?;
    Ok(tick)
}

fn parse_transaction(wire: sequencer_proto::pb::Transaction) -> Result<Transaction, ParseError> {
    Ok(Transaction {
        tx_id: wire.tx_id,
        tx_hash: hex::decode(&wire.tx_hash).unwrap_or_else(|_| wire.tx_hash.into_bytes()),
        payload: wire.payload,
        signature: wire.signature,
        public_key: wire.public_key,
        nonce: wire.nonce,
        client_timestamp: micros_to_datetime(wire.client_timestamp_micros),
        sequence_number: wire.sequence_number,
        ingestion_timestamp: micros_to_datetime(wire.ingestion_timestamp_micros),
    })
}

fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    Utc.timestamp_micros(micros)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().expect("epoch is always valid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_proto::pb::{Transaction as WireTransaction, VdfProof as WireVdfProof};

    fn sample_wire_tick() -> WireTick {
        WireTick {
            tick_number: 7,
            timestamp_micros: 1_700_000_000_000_000,
            vdf_proof: Some(WireVdfProof {
                input: vec![1],
                output: vec![2],
                proof: vec![3],
                iterations: 100,
            }),
            transactions: vec![WireTransaction {
                tx_id: "tx-1".into(),
                payload: vec![9],
                signature: vec![1, 2],
                public_key: vec![3, 4],
                nonce: 1,
                client_timestamp_micros: 1_700_000_000_000_000,
                sequence_number: 0,
                tx_hash: "deadbeef".into(),
                ingestion_timestamp_micros: 1_700_000_000_000_000,
            }],
            transaction_batch_hash: "batch-hash".into(),
            previous_output: String::new(),
        }
    }

    #[test]
    fn parses_a_valid_tick() {
        let tick = parse_tick(sample_wire_tick()).unwrap();
        assert_eq!(tick.tick_number, 7);
        assert_eq!(tick.transactions.len(), 1);
        assert_eq!(tick.transactions[0].tx_hash, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn rejects_missing_vdf_proof() {
        let mut wire = sample_wire_tick();
        wire.vdf_proof = None;
        assert!(matches!(parse_tick(wire), Err(ParseError::Nil("vdf_proof"))));
    }

    #[test]
    fn rejects_empty_batch_hash() {
        let mut wire = sample_wire_tick();
        wire.transaction_batch_hash.clear();
        assert!(matches!(parse_tick(wire), Err(ParseError::Invalid(_))));
    }

    #[test]
    fn preserves_transaction_order() {
        let mut wire = sample_wire_tick();
        let mut second = wire.transactions[0].clone();
        second.tx_id = "tx-2".into();
        second.tx_hash = "c0ffee".into();
        wire.transactions.push(second);

        let tick = parse_tick(wire).unwrap();
        assert_eq!(tick.transactions[0].tx_id, "tx-1");
        assert_eq!(tick.transactions[1].tx_id, "tx-2");
    }
}
