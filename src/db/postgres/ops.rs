use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

use crate::db::models::{PositionSnapshot, ReferencePrice, Snapshot, TradeEvent};
use crate::db::postgres::PostgresClient;
use crate::db::{PositionStore, SnapshotStore};

fn row_to_snapshot(row: &Row) -> Snapshot {
    Snapshot {
        pool_address: row.get("pool_address"),
        name: row.get("name"),
        ts: row.get("ts"),
        price_base: row.get("price_base"),
        reserve_base: row.get("reserve_base"),
        reserve_quote: row.get("reserve_quote"),
        base_token: row.get("base_token"),
        quote_token: row.get("quote_token"),
    }
}

fn row_to_trade_event(row: &Row) -> TradeEvent {
    TradeEvent {
        pool_address: row.get("pool_address"),
        base_token: row.get("base_token"),
        block_number: row.get("block_number"),
        tx_hash: row.get("tx_hash"),
        log_index: row.get("log_index"),
        ts: row.get("ts"),
        base_amount: row.get("base_amount"),
    }
}

fn row_to_position_snapshot(row: &Row) -> PositionSnapshot {
    PositionSnapshot {
        wallet_address: row.get("wallet_address"),
        pool_address: row.get("pool_address"),
        name: row.get("name"),
        ts: row.get("ts"),
        price_base: row.get("price_base"),
        lp_balance: row.get("lp_balance"),
        lp_share: row.get("lp_share"),
        user_base: row.get("user_base"),
        user_quote: row.get("user_quote"),
        volume_24h: row.get("volume_24h"),
        volume_7d: row.get("volume_7d"),
        fee_earn_24h: row.get("fee_earn_24h"),
        fee_earn_7d: row.get("fee_earn_7d"),
        pool_apr: row.get("pool_apr"),
    }
}

impl PostgresClient {
    // ==================== REFERENCE PRICE ====================

    /// The most recently recorded USD reference price, if any.
    pub async fn latest_reference_price(&self) -> anyhow::Result<Option<ReferencePrice>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT price_usd, source, ts
            FROM reference_price_snapshots
            ORDER BY ts DESC
            LIMIT 1
        "#;

        let row = client.query_opt(query, &[]).await?;

        Ok(row.map(|row| ReferencePrice {
            price_usd: row.get("price_usd"),
            source: row.get("source"),
            ts: row.get("ts"),
        }))
    }

    /// Append a USD reference price quote with its provider label.
    pub async fn insert_reference_price(&self, price_usd: f64, source: &str) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO reference_price_snapshots (price_usd, source) VALUES ($1, $2)",
                &[&price_usd, &source],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PostgresClient {
    async fn latest_snapshots(&self) -> anyhow::Result<Vec<Snapshot>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT DISTINCT ON (pool_address)
                pool_address, name, ts, price_base, reserve_base, reserve_quote,
                base_token, quote_token
            FROM pool_snapshots
            ORDER BY pool_address, ts DESC
        "#;

        let rows = client.query(query, &[]).await?;
        Ok(rows.iter().map(row_to_snapshot).collect())
    }

    async fn snapshot_before(
        &self,
        pool_address: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Option<Snapshot>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT
                pool_address, name, ts, price_base, reserve_base, reserve_quote,
                base_token, quote_token
            FROM pool_snapshots
            WHERE LOWER(pool_address) = LOWER($1) AND ts <= $2
            ORDER BY ts DESC
            LIMIT 1
        "#;

        let row = client.query_opt(query, &[&pool_address, &cutoff]).await?;
        Ok(row.as_ref().map(row_to_snapshot))
    }

    async fn trade_events_since(
        &self,
        pool_address: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TradeEvent>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT pool_address, base_token, block_number, tx_hash, log_index, ts, base_amount
            FROM trade_events
            WHERE LOWER(pool_address) = LOWER($1) AND ts >= $2
            ORDER BY ts ASC
        "#;

        let rows = client.query(query, &[&pool_address, &since]).await?;
        Ok(rows.iter().map(row_to_trade_event).collect())
    }
}

#[async_trait]
impl PositionStore for PostgresClient {
    async fn position_history(
        &self,
        wallet_address: &str,
    ) -> anyhow::Result<Vec<PositionSnapshot>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT
                wallet_address, pool_address, name, ts, price_base,
                lp_balance, lp_share, user_base, user_quote,
                volume_24h, volume_7d, fee_earn_24h, fee_earn_7d, pool_apr
            FROM position_snapshots
            WHERE LOWER(wallet_address) = LOWER($1)
            ORDER BY pool_address, ts ASC
        "#;

        let rows = client.query(query, &[&wallet_address]).await?;
        Ok(rows.iter().map(row_to_position_snapshot).collect())
    }

    async fn latest_positions(
        &self,
        wallet_address: &str,
    ) -> anyhow::Result<Vec<PositionSnapshot>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT DISTINCT ON (pool_address)
                wallet_address, pool_address, name, ts, price_base,
                lp_balance, lp_share, user_base, user_quote,
                volume_24h, volume_7d, fee_earn_24h, fee_earn_7d, pool_apr
            FROM position_snapshots
            WHERE LOWER(wallet_address) = LOWER($1)
            ORDER BY pool_address, ts DESC
        "#;

        let rows = client.query(query, &[&wallet_address]).await?;
        Ok(rows.iter().map(row_to_position_snapshot).collect())
    }
}
