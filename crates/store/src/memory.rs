use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use common::{
    DecisionLog, DecisionLogStore, ExecutionLog, ExecutionLogStore, OpenPosition, PositionStore,
    Result,
};

/// Every persistence port held in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    positions: RwLock<HashMap<Uuid, OpenPosition>>,
    decisions: RwLock<Vec<DecisionLog>>,
    executions: RwLock<Vec<ExecutionLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn positions(&self) -> Vec<OpenPosition> {
        self.positions.read().await.values().copied().collect()
    }

    pub async fn decisions(&self) -> Vec<DecisionLog> {
        self.decisions.read().await.clone()
    }
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn save(&self, position: &OpenPosition) -> Result<()> {
        self.positions.write().await.insert(position.bot_id, *position);
        Ok(())
    }

    async fn delete(&self, bot_id: Uuid) -> Result<()> {
        self.positions.write().await.remove(&bot_id);
        Ok(())
    }

    async fn get(&self, bot_id: Uuid) -> Result<Option<OpenPosition>> {
        Ok(self.positions.read().await.get(&bot_id).copied())
    }
}

#[async_trait]
impl DecisionLogStore for MemoryStore {
    async fn save(&self, log: &DecisionLog) -> Result<()> {
        self.decisions.write().await.push(log.clone());
        Ok(())
    }
}

#[async_trait]
impl ExecutionLogStore for MemoryStore {
    async fn save(&self, log: &ExecutionLog) -> Result<()> {
        self.executions.write().await.push(log.clone());
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ExecutionLog>> {
        Ok(self.executions.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn position_upsert_get_delete() {
        let store = MemoryStore::new();
        let bot = Uuid::new_v4();
        let open = |price| OpenPosition { bot_id: bot, entry_price: price, entry_timestamp: 60_000 };

        assert!(PositionStore::get(&store, bot).await.unwrap().is_none());
        PositionStore::save(&store, &open(10.0)).await.unwrap();
        PositionStore::save(&store, &open(12.0)).await.unwrap();
        assert_eq!(PositionStore::get(&store, bot).await.unwrap().unwrap().entry_price, 12.0);
        assert_eq!(store.positions().await.len(), 1);

        PositionStore::delete(&store, bot).await.unwrap();
        PositionStore::delete(&store, bot).await.unwrap();
        assert!(store.positions().await.is_empty());
    }
}
