//! Saves and restores operation state machines across process lifetimes.

use portal_bridge_sm::OperationSM;
use sqlx::{sqlite::SqliteQueryResult, Pool, Row, Sqlite};

use crate::errors::PersistErr;

/// System for persisting [`OperationSM`] instances to sqlite.
///
/// The machine is stored as an opaque serialized blob keyed by operation id;
/// the direction and step columns are denormalized copies for inspection
/// with plain sqlite tooling, never read back by the code.
#[derive(Debug, Clone)]
pub struct OperationPersister {
    pool: Pool<Sqlite>,
}

impl OperationPersister {
    /// Initializes the [`OperationPersister`], creating the backing table if
    /// it does not exist yet.
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self, PersistErr> {
        let _: SqliteQueryResult = sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS operations (
                id TEXT PRIMARY KEY,
                direction TEXT NOT NULL,
                step TEXT NOT NULL,
                state TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(OperationPersister { pool })
    }

    /// Inserts a freshly created operation.
    pub async fn init(&self, id: &str, sm: &OperationSM) -> Result<(), PersistErr> {
        let _: SqliteQueryResult = sqlx::query(
            r#"
            INSERT INTO operations (id, direction, step, state) VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(sm.direction().to_string())
        .bind(sm.step())
        .bind(serde_json::to_string(sm)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overwrites the persisted state of an operation after a transition.
    pub async fn commit(&self, id: &str, sm: &OperationSM) -> Result<(), PersistErr> {
        let result: SqliteQueryResult = sqlx::query(
            r#"
            UPDATE operations SET step = ?, state = ? WHERE id = ?
            "#,
        )
        .bind(sm.step())
        .bind(serde_json::to_string(sm)?)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistErr::UnknownOperation(id.to_string()));
        }
        Ok(())
    }

    /// Loads the persisted state of one operation.
    pub async fn load(&self, id: &str) -> Result<OperationSM, PersistErr> {
        let row = sqlx::query(
            r#"
            SELECT state FROM operations WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PersistErr::UnknownOperation(id.to_string()))?;

        let state: String = row.try_get("state")?;
        Ok(serde_json::from_str(&state)?)
    }

    /// Loads every persisted operation, id first.
    pub async fn load_all(&self) -> Result<Vec<(String, OperationSM)>, PersistErr> {
        let rows = sqlx::query(
            r#"
            SELECT id, state FROM operations ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let state: String = row.try_get("state")?;
                Ok((id, serde_json::from_str(&state)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256, U256};
    use portal_bridge_sm::{
        DepositCfg, DepositEvent, DepositSM, StateMachine, WithdrawalCfg, WithdrawalSM,
    };
    use sqlx::SqlitePool;

    use super::*;

    async fn persister() -> OperationPersister {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        OperationPersister::new(pool).await.unwrap()
    }

    fn deposit_sm() -> DepositSM {
        DepositSM::new(DepositCfg {
            amount: U256::from(1_000_000u64),
            recipient: Address::repeat_byte(0x11),
        })
    }

    #[tokio::test]
    async fn test_round_trip_preserves_state() {
        let persister = persister().await;

        let mut sm = deposit_sm();
        sm.process_event(DepositEvent::SubmissionAcked {
            txid: B256::repeat_byte(0x01),
        })
        .unwrap();
        let op = OperationSM::from(sm);

        persister.init("dep-1", &op).await.unwrap();
        let loaded = persister.load("dep-1").await.unwrap();
        assert_eq!(loaded, op);
        assert_eq!(loaded.step(), "submitted");
    }

    #[tokio::test]
    async fn test_commit_overwrites_previous_state() {
        let persister = persister().await;

        let mut sm = deposit_sm();
        persister
            .init("dep-1", &OperationSM::from(sm.clone()))
            .await
            .unwrap();

        sm.process_event(DepositEvent::SubmissionAcked {
            txid: B256::repeat_byte(0x01),
        })
        .unwrap();
        let op = OperationSM::from(sm);
        persister.commit("dep-1", &op).await.unwrap();

        assert_eq!(persister.load("dep-1").await.unwrap(), op);
    }

    #[tokio::test]
    async fn test_unknown_id_errors() {
        let persister = persister().await;
        assert!(matches!(
            persister.load("nope").await,
            Err(PersistErr::UnknownOperation(_))
        ));
        assert!(matches!(
            persister
                .commit("nope", &OperationSM::from(deposit_sm()))
                .await,
            Err(PersistErr::UnknownOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_load_all_spans_directions() {
        let persister = persister().await;
        persister
            .init("dep-1", &OperationSM::from(deposit_sm()))
            .await
            .unwrap();
        persister
            .init(
                "wd-1",
                &OperationSM::from(WithdrawalSM::new(WithdrawalCfg {
                    amount: U256::from(5u64),
                    recipient: Address::repeat_byte(0x22),
                })),
            )
            .await
            .unwrap();

        let all = persister.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, "dep-1");
        assert_eq!(all[1].0, "wd-1");
    }
}
