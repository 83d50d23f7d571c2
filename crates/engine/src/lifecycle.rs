use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use common::{Account, Error, MarketData, Result};
use strategy::{BotConfig, BotFileConfig};

use crate::connector::{ConnectorSettings, MarketDataConnector};
use crate::hub::EventHub;
use crate::runtime::{Ports, RuntimeState, StrategyRuntime};

/// Registry entry for one running bot.
#[derive(Clone)]
pub struct BotHandle {
    pub config: BotConfig,
    state: watch::Receiver<RuntimeState>,
    stop: CancellationToken,
}

impl BotHandle {
    /// Latest published state of the bot's runtime.
    pub fn state(&self) -> RuntimeState {
        self.state.borrow().clone()
    }

    /// Ask the bot's connector to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// Process-wide map of bot id → running bot. Entries are written once at
/// start and never removed while the process runs.
/// Clone-able via internal Arc.
#[derive(Clone, Default)]
pub struct BotRegistry {
    bots: Arc<RwLock<HashMap<Uuid, BotHandle>>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if the id is already registered.
    pub async fn insert(&self, handle: BotHandle) -> Result<()> {
        let mut bots = self.bots.write().await;
        if bots.contains_key(&handle.config.id) {
            return Err(Error::Config(format!("bot {} is already running", handle.config.id)));
        }
        bots.insert(handle.config.id, handle);
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Option<BotHandle> {
        self.bots.read().await.get(&id).cloned()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.bots.read().await.contains_key(&id)
    }

    /// Every registered bot, in no particular order.
    pub async fn list(&self) -> Vec<BotHandle> {
        self.bots.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.bots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bots.read().await.is_empty()
    }
}

/// Supervisor: builds a runtime per bot, spawns its connector and keeps the
/// registry and the shared hub.
pub struct Engine {
    account: Account,
    market: Arc<dyn MarketData>,
    ports: Ports,
    hub: EventHub,
    registry: BotRegistry,
    settings: ConnectorSettings,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<StrategyRuntime>>>,
}

impl Engine {
    pub fn new(
        account: Account,
        market: Arc<dyn MarketData>,
        ports: Ports,
        settings: ConnectorSettings,
    ) -> Self {
        Self {
            account,
            market,
            ports,
            hub: EventHub::new(),
            registry: BotRegistry::new(),
            settings,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &BotRegistry {
        &self.registry
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Start one bot. Configuration errors (unknown strategy, invalid
    /// indicators, invalid connector timings, duplicate id) are returned and
    /// nothing is spawned.
    pub async fn start_bot(&self, bot: BotConfig) -> Result<()> {
        self.settings.validate()?;
        if self.registry.contains(bot.id).await {
            return Err(Error::Config(format!("bot {} is already running", bot.id)));
        }
        let runtime = StrategyRuntime::new(
            self.account.clone(),
            bot.clone(),
            self.ports.clone(),
            self.hub.clone(),
        )?;

        let stop = self.shutdown.child_token();
        let handle = BotHandle {
            config: bot.clone(),
            state: runtime.state_receiver(),
            stop: stop.clone(),
        };
        let connector = MarketDataConnector::new(runtime, self.market.clone(), self.settings, stop)?;
        self.registry.insert(handle).await?;

        self.tasks.lock().await.push(tokio::spawn(connector.run()));

        info!(bot_id = %bot.id, symbol = %bot.symbol, strategy = %bot.strategy, "bot started");
        Ok(())
    }

    /// Start every active bot in the file. A bot that fails to start is
    /// logged and skipped; the rest still run. Returns how many started.
    pub async fn start_all(&self, file: &BotFileConfig) -> usize {
        let mut started = 0;
        for bot in &file.bots {
            if !bot.active {
                info!(bot_id = %bot.id, "bot inactive, skipping");
                continue;
            }
            match self.start_bot(bot.clone()).await {
                Ok(()) => started += 1,
                Err(e) => error!(bot_id = %bot.id, error = %e, "bot not started"),
            }
        }
        started
    }

    /// Stop every connector and wait for them to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "connector task ended abnormally");
            }
        }
        info!("engine stopped");
    }
}
