//! Local datastore reads (spec §4.4 tx-lookup/recent, §4.5 candles, §6
//! "Datastore layout"). The gateway only ever reads; the ingester owns
//! the schema and runs migrations (see `services/ingester/migrations`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use sequencer_proto::OhlcCandle;

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub tx_hash: String,
    pub tx_id: String,
    pub tick_number: i64,
    pub sequence_number: i64,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    pub nonce: i64,
    pub timestamp: DateTime<Utc>,
    pub tick_timestamp: DateTime<Utc>,
}

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }
}

fn row_to_transaction(row: sqlx::postgres::PgRow) -> TransactionRow {
    TransactionRow {
        tx_hash: row.get("tx_hash"),
        tx_id: row.get("tx_id"),
        tick_number: row.get("tick_number"),
        sequence_number: row.get("sequence_number"),
        payload: row.get("payload"),
        signature: row.get("signature"),
        public_key: row.get("public_key"),
        nonce: row.get("nonce"),
        timestamp: row.get("timestamp"),
        tick_timestamp: row.get("tick_timestamp"),
    }
}

/// Looks up one transaction by hex-encoded hash (spec §4.4 "Tx-by-hash
/// with fallback"). The hash has already been validated by the caller.
pub async fn find_transaction_by_hash(pool: &PgPool, hash: &str) -> Result<Option<TransactionRow>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT tx_hash, tx_id, tick_number, sequence_number, payload, signature, public_key, \
         nonce, timestamp, tick_timestamp FROM transactions WHERE tx_hash = $1",
    )
    .bind(hash)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(row_to_transaction))
}

/// Most recent transactions, newest first, bounded by `limit` (spec §4.4
/// "Recent transactions").
pub async fn recent_transactions(pool: &PgPool, limit: i64) -> Result<Vec<TransactionRow>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT tx_hash, tx_id, tick_number, sequence_number, payload, signature, public_key, \
         nonce, timestamp, tick_timestamp FROM transactions ORDER BY timestamp DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(row_to_transaction).collect())
}

/// Time-bucketed OHLC aggregation over `market_prices` (spec §4.5).
///
/// Uses the `DISTINCT ON` CTE form (spec.md §9 Open Question 2: the
/// `DISTINCT ON` and `ROW_NUMBER` variants are declared interchangeable;
/// this implementation picks `DISTINCT ON` for `open`/`close` and plain
/// aggregates for `high`/`low`).
pub async fn candles(
    pool: &PgPool,
    market_id: Uuid,
    bucket_width: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<OhlcCandle>, sqlx::Error> {
    const QUERY: &str = r#"
        WITH bucketed AS (
            SELECT date_bin($4::interval, ts, $2::timestamptz) AS bucket_start, ts, price
            FROM market_prices
            WHERE market_id = $1 AND ts >= $2 AND ts <= $3
        ),
        opens AS (
            SELECT DISTINCT ON (bucket_start) bucket_start, price AS open
            FROM bucketed ORDER BY bucket_start, ts ASC
        ),
        closes AS (
            SELECT DISTINCT ON (bucket_start) bucket_start, price AS close
            FROM bucketed ORDER BY bucket_start, ts DESC
        ),
        extremes AS (
            SELECT bucket_start, MAX(price) AS high, MIN(price) AS low
            FROM bucketed GROUP BY bucket_start
        )
        SELECT opens.bucket_start, opens.open, extremes.high, extremes.low, closes.close
        FROM opens
        JOIN closes USING (bucket_start)
        JOIN extremes USING (bucket_start)
        ORDER BY opens.bucket_start ASC
        LIMIT $5
        "#;

    let rows = sqlx::query(QUERY)
        .bind(market_id)
        .bind(from)
        .bind(to)
        .bind(bucket_width_as_interval(bucket_width))
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let open: rust_decimal_compat::Numeric = row.get("open");
            let high: rust_decimal_compat::Numeric = row.get("high");
            let low: rust_decimal_compat::Numeric = row.get("low");
            let close: rust_decimal_compat::Numeric = row.get("close");
            OhlcCandle {
                bucket_start: row.get("bucket_start"),
                open: normalize_price(open.0),
                high: normalize_price(high.0),
                low: normalize_price(low.0),
                close: normalize_price(close.0),
            }
        })
        .collect())
}

fn bucket_width_as_interval(tf: &str) -> String {
    match tf {
        "1m" => "1 minute",
        "5m" => "5 minutes",
        "15m" => "15 minutes",
        "1h" => "1 hour",
        "4h" => "4 hours",
        "1d" => "1 day",
        _ => "1 hour",
    }
    .to_owned()
}

/// Divides raw `market_prices.price` units by 10^6 and rounds
/// half-away-from-zero to 2 decimals (spec §3 "OHLCCandle").
fn normalize_price(raw: f64) -> f64 {
    let scaled = raw / 1_000_000.0;
    (scaled * 100.0).round() / 100.0
}

/// `sqlx`'s Postgres `NUMERIC` decodes into a string by default without
/// the `bigdecimal`/`rust_decimal` feature; this crate keeps the
/// dependency surface aligned with the teacher (no extra decimal crate)
/// by parsing the text form directly.
mod rust_decimal_compat {
    use sqlx::postgres::{PgTypeInfo, PgValueRef};
    use sqlx::{Decode, Postgres, Type};

    pub struct Numeric(pub f64);

    impl Type<Postgres> for Numeric {
        fn type_info() -> PgTypeInfo {
            <f64 as Type<Postgres>>::type_info()
        }

        fn compatible(ty: &PgTypeInfo) -> bool {
            <String as Type<Postgres>>::compatible(ty) || <f64 as Type<Postgres>>::compatible(ty)
        }
    }

    impl<'r> Decode<'r, Postgres> for Numeric {
        fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
            let text = <String as Decode<Postgres>>::decode(value)?;
            let parsed: f64 = text
                .parse()
                .map_err(|e: std::num::ParseFloatError| Box::new(e) as sqlx::error::BoxDynError)?;
            Ok(Numeric(parsed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_price_divides_and_rounds_half_away_from_zero() {
        assert_eq!(normalize_price(10_000_000.0), 10.00);
        assert_eq!(normalize_price(15_500_000.0), 15.50);
        assert_eq!(normalize_price(12_345_678.0), 12.35);
    }

    #[test]
    fn bucket_width_maps_all_spec_timeframes() {
        for tf in ["1m", "5m", "15m", "1h", "4h", "1d"] {
            assert!(!bucket_width_as_interval(tf).is_empty());
        }
    }
}
