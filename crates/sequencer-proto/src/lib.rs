//! Shared wire and domain types for the sequencer edge services.
//!
//! `pb` holds the generated gRPC client/server code for the sequencer's
//! RPC schema (treated as opaque beyond the fields this core references).
//! The rest of this crate is the validated domain representation that the
//! gateway and ingester exchange once a wire `Tick` has been accepted.

pub mod pb {
    tonic::include_proto!("sequencer.v1");
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain model (spec §3)
// ---------------------------------------------------------------------------

/// A verifiable-delay-function witness bound to a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdfProof {
    pub input: String,
    pub output: String,
    pub proof: String,
    pub iterations: u64,
}

impl VdfProof {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.output.is_empty() {
            return Err(DomainError::EmptyField("vdf_proof.output"));
        }
        if self.input.is_empty() {
            return Err(DomainError::EmptyField("vdf_proof.input"));
        }
        if self.proof.is_empty() {
            return Err(DomainError::EmptyField("vdf_proof.proof"));
        }
        if self.iterations == 0 {
            return Err(DomainError::ZeroValue("vdf_proof.iterations"));
        }
        Ok(())
    }
}

/// One transaction inside a tick's ordered batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    #[serde(with = "hex_bytes")]
    pub tx_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    pub nonce: u64,
    pub client_timestamp: DateTime<Utc>,
    pub sequence_number: u64,
    pub ingestion_timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.tx_hash.is_empty() {
            return Err(DomainError::EmptyField("tx_hash"));
        }
        if self.signature.is_empty() {
            return Err(DomainError::EmptyField("signature"));
        }
        if self.public_key.is_empty() {
            return Err(DomainError::EmptyField("public_key"));
        }
        Ok(())
    }
}

/// One sequencer step: metadata, a VDF proof, and an ordered transaction batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub tick_number: u64,
    pub timestamp: DateTime<Utc>,
    pub vdf_proof: VdfProof,
    pub batch_hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub previous_output: String,
    pub transactions: Vec<Transaction>,
    pub received_at: DateTime<Utc>,
}

impl Tick {
    /// Validates the invariants from spec §3. Transaction invariants are
    /// checked in stream order; the first offending index is reported.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.tick_number == 0 {
            return Err(DomainError::ZeroValue("tick_number"));
        }
        if self.timestamp.timestamp_micros() == 0 {
            return Err(DomainError::ZeroValue("timestamp"));
        }
        if self.batch_hash.is_empty() {
            return Err(DomainError::EmptyField("batch_hash"));
        }
        self.vdf_proof.validate()?;
        for (index, tx) in self.transactions.iter().enumerate() {
            tx.validate()
                .map_err(|e| DomainError::Transaction { index, source: Box::new(e) })?;
        }
        Ok(())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{0} must be non-zero")]
    ZeroValue(&'static str),
    #[error("nil {0}")]
    Nil(&'static str),
    #[error("transaction {index}: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: Box<DomainError>,
    },
}

// ---------------------------------------------------------------------------
// Candle aggregation (spec §3, §4.5)
// ---------------------------------------------------------------------------

/// One OHLC candle for a fixed-width time bucket.
///
/// `open`/`high`/`low`/`close` are monetary scalars already divided by
/// 10^6 and rounded half-away-from-zero to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcCandle {
    pub bucket_start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcCandle {
    /// Encodes as the compact `[ts_ms, open, high, low, close]` array form
    /// the gateway serves (spec §4.5 "Encoding").
    pub fn to_array(self) -> serde_json::Value {
        serde_json::json!([
            self.bucket_start.timestamp_millis(),
            self.open,
            self.high,
            self.low,
            self.close,
        ])
    }
}

// ---------------------------------------------------------------------------
// HTTP error envelope (spec §4.1.2, §7)
// ---------------------------------------------------------------------------

/// The minimal JSON error body shared by every non-2xx gateway response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl HttpErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), message: None, request_id: None }
    }

    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error: error.into(), message: Some(message.into()), request_id: None }
    }
}
