//! JSON encodings for the generated gRPC message types (spec §4.4 "encode
//! the response as JSON"). The `pb` types don't derive `Serialize` (they're
//! generated straight from the proto, spec §6 "treated as opaque"), so
//! this module is the one place that knows the field mapping both ways.

use sequencer_proto::pb;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn transaction_to_json(tx: &pb::Transaction) -> Value {
    json!({
        "tx_id": tx.tx_id,
        "payload": hex::encode(&tx.payload),
        "signature": hex::encode(&tx.signature),
        "public_key": hex::encode(&tx.public_key),
        "nonce": tx.nonce,
        "client_timestamp_micros": tx.client_timestamp_micros,
        "sequence_number": tx.sequence_number,
        "tx_hash": tx.tx_hash,
        "ingestion_timestamp_micros": tx.ingestion_timestamp_micros,
    })
}

pub fn vdf_proof_to_json(proof: &pb::VdfProof) -> Value {
    json!({
        "input": hex::encode(&proof.input),
        "output": hex::encode(&proof.output),
        "proof": hex::encode(&proof.proof),
        "iterations": proof.iterations,
    })
}

pub fn tick_to_json(tick: &pb::Tick) -> Value {
    json!({
        "tick_number": tick.tick_number,
        "timestamp_micros": tick.timestamp_micros,
        "vdf_proof": tick.vdf_proof.as_ref().map(vdf_proof_to_json),
        "transactions": tick.transactions.iter().map(transaction_to_json).collect::<Vec<_>>(),
        "transaction_batch_hash": tick.transaction_batch_hash,
        "previous_output": tick.previous_output,
    })
}

#[derive(Debug, Deserialize)]
pub struct TransactionInput {
    pub tx_id: String,
    #[serde(with = "hex_field")]
    pub payload: Vec<u8>,
    #[serde(with = "hex_field")]
    pub signature: Vec<u8>,
    #[serde(with = "hex_field")]
    pub public_key: Vec<u8>,
    pub nonce: u64,
    pub client_timestamp_micros: i64,
}

impl From<TransactionInput> for pb::Transaction {
    fn from(input: TransactionInput) -> Self {
        pb::Transaction {
            tx_id: input.tx_id,
            payload: input.payload,
            signature: input.signature,
            public_key: input.public_key,
            nonce: input.nonce,
            client_timestamp_micros: input.client_timestamp_micros,
            sequence_number: 0,
            tx_hash: String::new(),
            ingestion_timestamp_micros: 0,
        }
    }
}

mod hex_field {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_to_json_hex_encodes_byte_fields() {
        let tx = pb::Transaction {
            tx_id: "t1".into(),
            payload: vec![0xde, 0xad],
            signature: vec![],
            public_key: vec![],
            nonce: 1,
            client_timestamp_micros: 0,
            sequence_number: 5,
            tx_hash: "abc".into(),
            ingestion_timestamp_micros: 0,
        };
        let v = transaction_to_json(&tx);
        assert_eq!(v["payload"], "dead");
        assert_eq!(v["sequence_number"], 5);
    }

    #[test]
    fn transaction_input_round_trips_hex_fields() {
        let json = serde_json::json!({
            "tx_id": "t1",
            "payload": "dead",
            "signature": "",
            "public_key": "",
            "nonce": 1,
            "client_timestamp_micros": 0,
        });
        let input: TransactionInput = serde_json::from_value(json).unwrap();
        assert_eq!(input.payload, vec![0xde, 0xad]);
        let tx: pb::Transaction = input.into();
        assert_eq!(tx.tx_id, "t1");
    }
}
