use async_trait::async_trait;
use uuid::Uuid;

use crate::{DecisionLog, ExecutionLog, OpenPosition, Result};

/// Durable open-position records, one per bot at most.
/// Implementations must be safe for concurrent use from many bots.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Upsert by `bot_id`.
    async fn save(&self, position: &OpenPosition) -> Result<()>;

    async fn delete(&self, bot_id: Uuid) -> Result<()>;

    /// `Ok(None)` when the bot is flat.
    async fn get(&self, bot_id: Uuid) -> Result<Option<OpenPosition>>;
}

#[async_trait]
pub trait DecisionLogStore: Send + Sync {
    async fn save(&self, log: &DecisionLog) -> Result<()>;
}

#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    async fn save(&self, log: &ExecutionLog) -> Result<()>;

    /// Every closed trade, oldest first. Used for performance reporting.
    async fn all(&self) -> Result<Vec<ExecutionLog>>;
}
