//! SQLite State Store
//!
//! Durable implementation of [`StateStore`] on sqlx. Bandit bumps are a
//! single upsert statement, so concurrent updates to the same
//! (regime, signal) pair cannot lose increments.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use advisor_core::{DecisionRecord, RlState};

use crate::error::{Result, StoreError};
use crate::StateStore;

use async_trait::async_trait;

/// SQLite-backed implementation of [`StateStore`].
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub async fn connect(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        // WAL keeps readers unblocked while the backtest writes
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
        sqlx::query("PRAGMA temp_store=MEMORY").execute(&pool).await?;

        let store = Self { pool };
        store.init_schema().await?;
        tracing::info!("SQLite store ready at {path}");
        Ok(store)
    }

    /// In-memory database for tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rl_state (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                regime_key TEXT NOT NULL,
                signal_name TEXT NOT NULL,
                alpha REAL NOT NULL DEFAULT 1.0,
                beta REAL NOT NULL DEFAULT 1.0,
                last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(regime_key, signal_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decision_history (
                decision_id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                symbol TEXT NOT NULL,
                sector TEXT,
                decision TEXT NOT NULL,
                confidence REAL NOT NULL,
                weights_used TEXT,
                market_regime TEXT,
                agent_outputs TEXT,
                outcome_7d REAL,
                reward REAL,
                evaluated BOOLEAN NOT NULL DEFAULT 0,
                conversation_id TEXT,
                turn_number INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_rl_state_regime ON rl_state(regime_key)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_decisions_symbol ON decision_history(symbol, timestamp)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_decisions_regime ON decision_history(market_regime)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn decode_decision(row: &SqliteRow) -> Result<DecisionRecord> {
        let decision_label: String = row.try_get("decision")?;
        let decision = decision_label
            .parse()
            .map_err(|_| StoreError::Decode(format!("decision label '{decision_label}'")))?;

        let timestamp: DateTime<Utc> = row.try_get("timestamp")?;

        let weights_json: Option<String> = row.try_get("weights_used")?;
        let weights_used = match weights_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Default::default(),
        };

        let outputs_json: Option<String> = row.try_get("agent_outputs")?;
        let agent_outputs = match outputs_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Default::default(),
        };

        let conversation_id: Option<String> = row.try_get("conversation_id")?;
        let conversation_id = conversation_id
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|_| StoreError::Decode(format!("conversation id '{s}'")))
            })
            .transpose()?;

        let turn_number: Option<i64> = row.try_get("turn_number")?;

        Ok(DecisionRecord {
            id: Some(row.try_get("decision_id")?),
            timestamp,
            symbol: row.try_get("symbol")?,
            sector: row.try_get("sector")?,
            decision,
            confidence: row.try_get("confidence")?,
            weights_used,
            market_regime: row.try_get::<Option<String>, _>("market_regime")?.unwrap_or_default(),
            agent_outputs,
            outcome_7d: row.try_get("outcome_7d")?,
            reward: row.try_get("reward")?,
            evaluated: row.try_get("evaluated")?,
            conversation_id,
            turn_number: turn_number.map(|n| n as u32),
        })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn rl_state(&self, regime_key: &str, signal_name: &str) -> Result<Option<RlState>> {
        let row = sqlx::query(
            "SELECT alpha, beta FROM rl_state WHERE regime_key = ?1 AND signal_name = ?2",
        )
        .bind(regime_key)
        .bind(signal_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| RlState {
            regime_key: regime_key.to_string(),
            signal_name: signal_name.to_string(),
            alpha: row.get("alpha"),
            beta: row.get("beta"),
        }))
    }

    async fn rl_states_for_regime(&self, regime_key: &str) -> Result<Vec<RlState>> {
        let rows = sqlx::query(
            "SELECT signal_name, alpha, beta FROM rl_state WHERE regime_key = ?1",
        )
        .bind(regime_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RlState {
                regime_key: regime_key.to_string(),
                signal_name: row.get("signal_name"),
                alpha: row.get("alpha"),
                beta: row.get("beta"),
            })
            .collect())
    }

    async fn bump_rl_state(
        &self,
        regime_key: &str,
        signal_name: &str,
        alpha_delta: f64,
        beta_delta: f64,
    ) -> Result<RlState> {
        // One statement: insert at the prior plus deltas, or add the deltas
        // to the existing row. Serialization happens inside SQLite.
        let row = sqlx::query(
            r#"
            INSERT INTO rl_state (regime_key, signal_name, alpha, beta)
            VALUES (?1, ?2, 1.0 + ?3, 1.0 + ?4)
            ON CONFLICT(regime_key, signal_name) DO UPDATE SET
                alpha = rl_state.alpha + ?3,
                beta = rl_state.beta + ?4,
                last_updated = CURRENT_TIMESTAMP
            RETURNING alpha, beta
            "#,
        )
        .bind(regime_key)
        .bind(signal_name)
        .bind(alpha_delta)
        .bind(beta_delta)
        .fetch_one(&self.pool)
        .await?;

        let state = RlState {
            regime_key: regime_key.to_string(),
            signal_name: signal_name.to_string(),
            alpha: row.get("alpha"),
            beta: row.get("beta"),
        };
        tracing::debug!(
            "rl_state {}/{}: α={:.4}, β={:.4}",
            regime_key,
            signal_name,
            state.alpha,
            state.beta
        );
        Ok(state)
    }

    async fn record_decision(&self, record: &DecisionRecord) -> Result<i64> {
        let weights_json = serde_json::to_string(&record.weights_used)?;
        let outputs_json = serde_json::to_string(&record.agent_outputs)?;

        let row = sqlx::query(
            r#"
            INSERT INTO decision_history
                (timestamp, symbol, sector, decision, confidence, weights_used,
                 market_regime, agent_outputs, conversation_id, turn_number)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING decision_id
            "#,
        )
        .bind(record.timestamp)
        .bind(&record.symbol)
        .bind(&record.sector)
        .bind(record.decision.as_str())
        .bind(record.confidence)
        .bind(weights_json)
        .bind(&record.market_regime)
        .bind(outputs_json)
        .bind(record.conversation_id.map(|id| id.to_string()))
        .bind(record.turn_number.map(i64::from))
        .fetch_one(&self.pool)
        .await?;

        let decision_id: i64 = row.get("decision_id");
        tracing::info!(
            "Recorded decision {} for {}: {}",
            decision_id,
            record.symbol,
            record.decision
        );
        Ok(decision_id)
    }

    async fn record_outcome(&self, decision_id: i64, outcome_7d: f64, reward: f64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE decision_history
            SET outcome_7d = ?1, reward = ?2, evaluated = 1
            WHERE decision_id = ?3
            "#,
        )
        .bind(outcome_7d)
        .bind(reward)
        .bind(decision_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DecisionNotFound(decision_id));
        }
        tracing::info!(
            "Decision {} evaluated: outcome={:.2}%, reward={:.4}",
            decision_id,
            outcome_7d,
            reward
        );
        Ok(())
    }

    async fn unevaluated_decisions(&self) -> Result<Vec<DecisionRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM decision_history WHERE evaluated = 0 ORDER BY timestamp ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode_decision).collect()
    }

    async fn decisions_by_regime(&self, regime_key: &str) -> Result<Vec<DecisionRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM decision_history WHERE market_regime = ?1 ORDER BY timestamp DESC",
        )
        .bind(regime_key)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode_decision).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::Decision;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_bump_cold_start_then_increment() {
        let store = SqliteStateStore::connect_in_memory().await.unwrap();

        assert!(store.rl_state("high_rising_bearish", "current").await.unwrap().is_none());

        let state = store
            .bump_rl_state("high_rising_bearish", "current", 0.08, 0.0)
            .await
            .unwrap();
        assert!((state.alpha - 1.08).abs() < 1e-9);
        assert!((state.beta - 1.0).abs() < 1e-9);

        let state = store
            .bump_rl_state("high_rising_bearish", "current", 0.0, 0.04)
            .await
            .unwrap();
        assert!((state.alpha - 1.08).abs() < 1e-9);
        assert!((state.beta - 1.04).abs() < 1e-9);

        // One row per pair, enforced by the unique constraint
        let states = store.rl_states_for_regime("high_rising_bearish").await.unwrap();
        assert_eq!(states.len(), 1);
    }

    #[tokio::test]
    async fn test_decision_round_trip() {
        let store = SqliteStateStore::connect_in_memory().await.unwrap();

        let mut weights = HashMap::new();
        weights.insert("inflation".to_string(), 0.12);

        let record = DecisionRecord::new(
            "NIFTY50",
            Decision::Sell,
            0.72,
            weights,
            "high_rising_bearish",
        )
        .with_sector("Index");

        let id = store.record_decision(&record).await.unwrap();

        let pending = store.unevaluated_decisions().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].decision, Decision::Sell);
        assert_eq!(pending[0].weights_used.get("inflation"), Some(&0.12));

        store.record_outcome(id, -2.3, 1.2).await.unwrap();
        assert!(store.unevaluated_decisions().await.unwrap().is_empty());

        let evaluated = store.decisions_by_regime("high_rising_bearish").await.unwrap();
        assert_eq!(evaluated.len(), 1);
        assert_eq!(evaluated[0].outcome_7d, Some(-2.3));
        assert!(evaluated[0].evaluated);
    }

    #[tokio::test]
    async fn test_outcome_for_missing_decision() {
        let store = SqliteStateStore::connect_in_memory().await.unwrap();
        let result = store.record_outcome(99, 0.0, 0.0).await;
        assert!(matches!(result, Err(StoreError::DecisionNotFound(99))));
    }
}
