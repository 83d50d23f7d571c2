use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use common::{
    DecisionLog, DecisionLogStore, Error, ExecutionLog, ExecutionLogStore, OpenPosition,
    PositionStore, Result, StrategyInfo, TradePoint,
};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

fn db_err(e: impl std::fmt::Display) -> Error {
    Error::Persistence(e.to_string())
}

/// SQLite-backed persistence ports. Open positions survive a restart; the
/// decision and execution logs are append-only tables.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://candlebot.db` or `sqlite::memory:`),
    /// creating the file if needed, and run pending migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);

        // Every connection to an in-memory database is a separate database.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        }
        .connect_with(options)
        .await
        .map_err(db_err)?;

        MIGRATOR.run(&pool).await.map_err(db_err)?;
        info!(url, "database ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl PositionStore for SqliteStore {
    async fn save(&self, position: &OpenPosition) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO open_positions (bot_id, entry_price, entry_timestamp)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(bot_id) DO UPDATE SET
                entry_price = excluded.entry_price,
                entry_timestamp = excluded.entry_timestamp
            "#,
        )
        .bind(position.bot_id.to_string())
        .bind(position.entry_price)
        .bind(position.entry_timestamp)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(bot_id = %position.bot_id, price = position.entry_price, "open position saved");
        Ok(())
    }

    async fn delete(&self, bot_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM open_positions WHERE bot_id = ?1")
            .bind(bot_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        debug!(%bot_id, "open position deleted");
        Ok(())
    }

    async fn get(&self, bot_id: Uuid) -> Result<Option<OpenPosition>> {
        let row: Option<(f64, i64)> = sqlx::query_as(
            "SELECT entry_price, entry_timestamp FROM open_positions WHERE bot_id = ?1",
        )
        .bind(bot_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|(entry_price, entry_timestamp)| OpenPosition {
            bot_id,
            entry_price,
            entry_timestamp,
        }))
    }
}

#[async_trait]
impl DecisionLogStore for SqliteStore {
    async fn save(&self, log: &DecisionLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO decision_logs
                (bot_id, symbol, candle_interval, timestamp, decision,
                 indicators, strategy, context, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(log.bot_id.to_string())
        .bind(&log.symbol)
        .bind(&log.interval)
        .bind(log.timestamp)
        .bind(log.decision.to_string())
        .bind(serde_json::to_string(&log.indicators)?)
        .bind(serde_json::to_string(&log.strategy)?)
        .bind(log.context.to_string())
        .bind(log.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionLogStore for SqliteStore {
    async fn save(&self, log: &ExecutionLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO execution_logs
                (bot_id, symbol, candle_interval, entry_price, entry_timestamp,
                 exit_price, exit_timestamp, duration, profit, roi_pct, strategy, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(log.bot_id.to_string())
        .bind(&log.symbol)
        .bind(&log.interval)
        .bind(log.entry.price)
        .bind(log.entry.timestamp)
        .bind(log.exit.price)
        .bind(log.exit.timestamp)
        .bind(log.duration)
        .bind(log.profit)
        .bind(log.roi_pct)
        .bind(serde_json::to_string(&log.strategy)?)
        .bind(log.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ExecutionLog>> {
        let rows = sqlx::query(
            r#"
            SELECT bot_id, symbol, candle_interval, entry_price, entry_timestamp,
                   exit_price, exit_timestamp, duration, profit, roi_pct, strategy, created_at
            FROM execution_logs ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(execution_from_row).collect()
    }
}

fn execution_from_row(row: &SqliteRow) -> Result<ExecutionLog> {
    let bot_id: String = row.try_get("bot_id").map_err(db_err)?;
    let strategy: String = row.try_get("strategy").map_err(db_err)?;
    let created_at: String = row.try_get("created_at").map_err(db_err)?;

    Ok(ExecutionLog {
        bot_id: Uuid::parse_str(&bot_id).map_err(db_err)?,
        symbol: row.try_get("symbol").map_err(db_err)?,
        interval: row.try_get("candle_interval").map_err(db_err)?,
        entry: TradePoint {
            price: row.try_get("entry_price").map_err(db_err)?,
            timestamp: row.try_get("entry_timestamp").map_err(db_err)?,
        },
        exit: TradePoint {
            price: row.try_get("exit_price").map_err(db_err)?,
            timestamp: row.try_get("exit_timestamp").map_err(db_err)?,
        },
        duration: row.try_get("duration").map_err(db_err)?,
        profit: row.try_get("profit").map_err(db_err)?,
        roi_pct: row.try_get("roi_pct").map_err(db_err)?,
        strategy: serde_json::from_str::<StrategyInfo>(&strategy)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(db_err)?
            .with_timezone(&Utc),
    })
}
