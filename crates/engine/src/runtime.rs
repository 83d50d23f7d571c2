use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{
    Account, Candle, Decision, DecisionLog, DecisionLogStore, ExecutionLog, ExecutionLogStore,
    HubEvent, OpenPosition, PositionStore, Result, StrategyInfo, TradePoint,
};
use strategy::snapshot::META_PREV_RSI;
use strategy::{
    build_snapshot, build_strategy, calibrate, BotConfig, Calibration, CandleWindow, EntryFilter,
    IndicatorSnapshot, Requirements, Strategy, StrategyContext,
};

use crate::hub::EventHub;
use crate::report;

/// The persistence ports a runtime writes through.
#[derive(Clone)]
pub struct Ports {
    pub positions: Arc<dyn PositionStore>,
    pub decisions: Arc<dyn DecisionLogStore>,
    pub executions: Arc<dyn ExecutionLogStore>,
}

impl Ports {
    /// All three ports served by one store.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: PositionStore + DecisionLogStore + ExecutionLogStore + 'static,
    {
        Self { positions: store.clone(), decisions: store.clone(), executions: store }
    }
}

/// Binary position state of one bot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    #[default]
    Flat,
    InPosition {
        entry_price: f64,
        /// Epoch milliseconds.
        entry_timestamp: i64,
    },
}

impl PositionState {
    pub fn quantity(&self) -> u8 {
        match self {
            PositionState::Flat => 0,
            PositionState::InPosition { .. } => 1,
        }
    }
}

/// Read-only view of a runtime, refreshed after every candle and decision.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeState {
    pub bot_id: Uuid,
    pub symbol: String,
    pub interval: String,
    pub strategy: String,
    pub position: PositionState,
    pub last_decision: Decision,
    pub total_candles: u64,
    pub calibration: Option<Calibration>,
    pub window: Vec<Candle>,
}

/// One bot's decision pipeline: candle window, position state machine and
/// the side effects of each decision.
///
/// Owned by exactly one connector task, so all mutation is sequential.
pub struct StrategyRuntime {
    account: Account,
    bot: BotConfig,
    strategy: Box<dyn Strategy>,
    requirements: Requirements,
    entry_filter: EntryFilter,
    window: CandleWindow,
    position: PositionState,
    last_decision: Decision,
    calibration: Option<Calibration>,
    ports: Ports,
    hub: EventHub,
    state_tx: watch::Sender<RuntimeState>,
}

impl StrategyRuntime {
    /// Fails with a configuration error (unknown strategy, invalid
    /// indicator settings); the bot must not run in that case.
    pub fn new(account: Account, bot: BotConfig, ports: Ports, hub: EventHub) -> Result<Self> {
        bot.validate()?;
        let strategy = build_strategy(&bot.strategy, &bot.indicators)?;
        let requirements = strategy.requirements();
        let entry_filter = strategy.entry_filter().with_overrides(&bot.indicators);
        let window = CandleWindow::new(bot.window_size);

        let (state_tx, _) = watch::channel(RuntimeState {
            bot_id: bot.id,
            symbol: bot.symbol.clone(),
            interval: bot.interval.clone(),
            strategy: strategy.name().to_string(),
            position: PositionState::Flat,
            last_decision: Decision::Hold,
            total_candles: 0,
            calibration: None,
            window: Vec::new(),
        });

        Ok(Self {
            account,
            bot,
            strategy,
            requirements,
            entry_filter,
            window,
            position: PositionState::Flat,
            last_decision: Decision::Hold,
            calibration: None,
            ports,
            hub,
            state_tx,
        })
    }

    pub fn bot(&self) -> &BotConfig {
        &self.bot
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    pub fn is_flat(&self) -> bool {
        self.position == PositionState::Flat
    }

    pub fn last_decision(&self) -> Decision {
        self.last_decision
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration
    }

    pub fn window(&self) -> &CandleWindow {
        &self.window
    }

    pub fn last_candle_time(&self) -> Option<i64> {
        self.window.last().map(|c| c.time)
    }

    pub fn state_receiver(&self) -> watch::Receiver<RuntimeState> {
        self.state_tx.subscribe()
    }

    /// Resume IN_POSITION from a persisted open position, if any.
    /// Store failures are logged and leave the bot flat.
    pub async fn restore_position(&mut self) -> bool {
        match self.ports.positions.get(self.bot.id).await {
            Ok(Some(open)) => {
                self.position = PositionState::InPosition {
                    entry_price: open.entry_price,
                    entry_timestamp: open.entry_timestamp,
                };
                info!(
                    bot_id = %self.bot.id,
                    symbol = %self.bot.symbol,
                    price = open.entry_price,
                    "restored open position"
                );
                self.publish_state();
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(bot_id = %self.bot.id, error = %e, "failed to load open position, starting flat");
                false
            }
        }
    }

    /// Append a closed candle. No decision is taken here.
    pub fn update_candle(&mut self, candle: Candle) {
        self.window.push(candle);
        self.publish_state();
    }

    /// Push a "candle" event for the latest closed candle.
    pub fn publish_candle(&self, candle: &Candle) {
        self.broadcast(&HubEvent::candle(&self.bot.symbol, candle));
    }

    /// Locate the latest trend reversal in a freshly backfilled window.
    /// Only meaningful while flat; an open position is never touched.
    pub fn calibrate_last_entry(&mut self) {
        if !self.is_flat() {
            debug!(bot_id = %self.bot.id, "skipping calibration, position is open");
            return;
        }
        self.calibration = calibrate(&self.window);
        if let Some(cal) = self.calibration {
            debug!(
                bot_id = %self.bot.id,
                signal = %cal.signal,
                price = cal.reference_price,
                calibrated_at = cal.calibrated_at,
                "calibrated last entry"
            );
        }
        self.publish_state();
    }

    /// Run the strategy on the current window and apply the outcome.
    /// `timestamp_ms` is the close time of the candle being decided on.
    pub async fn evaluate(&mut self, timestamp_ms: i64) -> Decision {
        let candles = self.window.to_vec();
        let Some(snapshot) = build_snapshot(&candles, &self.bot.indicators, &self.requirements)
        else {
            return Decision::Hold;
        };

        let decision = self.strategy.evaluate(&snapshot, &self.context());
        let applied = match (decision, self.position) {
            (Decision::Buy, PositionState::Flat) => self.enter(&snapshot, timestamp_ms).await,
            (Decision::Sell, PositionState::InPosition { entry_price, entry_timestamp }) => {
                let entry = TradePoint { price: entry_price, timestamp: entry_timestamp };
                self.exit(&snapshot, entry, timestamp_ms).await
            }
            (Decision::Hold, _) => Decision::Hold,
            (other, position) => {
                debug!(bot_id = %self.bot.id, decision = %other, ?position, "ignoring decision for current position");
                Decision::Hold
            }
        };
        if applied != Decision::Hold {
            self.publish_state();
        }
        applied
    }

    async fn enter(&mut self, snapshot: &IndicatorSnapshot, timestamp_ms: i64) -> Decision {
        if let Err(reason) = self.entry_filter.check(snapshot) {
            debug!(bot_id = %self.bot.id, symbol = %self.bot.symbol, %reason, "entry rejected by filter");
            return Decision::Hold;
        }

        let price = snapshot.price;
        self.position = PositionState::InPosition { entry_price: price, entry_timestamp: timestamp_ms };
        self.last_decision = Decision::Buy;

        let open = OpenPosition { bot_id: self.bot.id, entry_price: price, entry_timestamp: timestamp_ms };
        if let Err(e) = self.ports.positions.save(&open).await {
            warn!(bot_id = %self.bot.id, error = %e, "failed to persist open position");
        }
        self.log_decision(Decision::Buy, snapshot, timestamp_ms, None).await;
        self.broadcast(&HubEvent::decision(&self.bot.symbol, timestamp_ms, price, Decision::Buy));

        info!(bot_id = %self.bot.id, symbol = %self.bot.symbol, price, "entry executed");
        Decision::Buy
    }

    async fn exit(&mut self, snapshot: &IndicatorSnapshot, entry: TradePoint, timestamp_ms: i64) -> Decision {
        let price = snapshot.price;
        let reason = self.exit_reason(snapshot, entry.price);

        self.position = PositionState::Flat;
        self.last_decision = Decision::Sell;

        if let Err(e) = self.ports.positions.delete(self.bot.id).await {
            warn!(bot_id = %self.bot.id, error = %e, "failed to delete open position");
        }

        let execution = ExecutionLog::close(
            self.bot.id,
            &self.bot.symbol,
            &self.bot.interval,
            entry,
            TradePoint { price, timestamp: timestamp_ms },
            self.strategy_info(),
        );
        self.log_decision(Decision::Sell, snapshot, timestamp_ms, Some(&reason)).await;
        if let Err(e) = self.ports.executions.save(&execution).await {
            warn!(bot_id = %self.bot.id, error = %e, "failed to persist execution log");
        }
        self.broadcast(&HubEvent::decision(&self.bot.symbol, timestamp_ms, price, Decision::Sell));

        info!(
            bot_id = %self.bot.id,
            symbol = %self.bot.symbol,
            price,
            profit = execution.profit,
            roi_pct = execution.roi_pct,
            %reason,
            "exit executed"
        );
        report::spawn_recompute(self.ports.executions.clone());
        Decision::Sell
    }

    /// Human-readable explanation of a SELL. Audit only.
    fn exit_reason(&self, snapshot: &IndicatorSnapshot, entry_price: f64) -> String {
        let cfg = &self.bot.indicators;
        let price = snapshot.price;
        let stop = entry_price - snapshot.atr * cfg.atr_multiplier;
        let trailing = cfg.trailing_ema();

        if price < stop {
            return format!("ATR stop hit ({price:.2} < {stop:.2})");
        }
        if let Some(ema) = snapshot.ema(trailing).filter(|ema| price < *ema) {
            return format!("price below EMA({trailing}) ({price:.2} < {ema:.2})");
        }
        if let Some(prev) = snapshot.meta(META_PREV_RSI) {
            if prev > cfg.rsi_sell && snapshot.rsi < prev {
                return format!("RSI reversal ({:.2} < {prev:.2})", snapshot.rsi);
            }
        }
        format!("{} signal reversal", self.strategy.name())
    }

    async fn log_decision(
        &self,
        decision: Decision,
        snapshot: &IndicatorSnapshot,
        timestamp_ms: i64,
        reason: Option<&str>,
    ) {
        let log = DecisionLog {
            bot_id: self.bot.id,
            symbol: self.bot.symbol.clone(),
            interval: self.bot.interval.clone(),
            timestamp: timestamp_ms,
            decision,
            indicators: snapshot.indicator_values(),
            strategy: self.strategy_info(),
            context: json!({
                "account_id": self.account.id,
                "candles_total": self.window.total_candles(),
                "calibrated_at": self.calibration.map(|c| c.calibrated_at),
                "position_quantity": self.position.quantity(),
                "reason": reason,
            }),
            created_at: Utc::now(),
        };
        if let Err(e) = self.ports.decisions.save(&log).await {
            warn!(bot_id = %self.bot.id, error = %e, "failed to persist decision log");
        }
    }

    fn context(&self) -> StrategyContext {
        let (last_entry_price, last_entry_timestamp) = match self.position {
            PositionState::InPosition { entry_price, entry_timestamp } => (entry_price, entry_timestamp),
            PositionState::Flat => (0.0, 0),
        };
        StrategyContext {
            account: self.account.clone(),
            bot_id: self.bot.id,
            symbol: self.bot.symbol.clone(),
            position_quantity: self.position.quantity(),
            last_entry_price,
            last_entry_timestamp,
        }
    }

    fn strategy_info(&self) -> StrategyInfo {
        StrategyInfo {
            name: self.strategy.name().to_string(),
            version: self.strategy.version().to_string(),
            parameters: self.strategy.parameters(),
        }
    }

    /// Events go to the bot's own subject and to the symbol's.
    fn broadcast(&self, event: &HubEvent) {
        self.hub.publish(&self.bot.id.to_string(), event);
        self.hub.publish(&self.bot.symbol, event);
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(RuntimeState {
            bot_id: self.bot.id,
            symbol: self.bot.symbol.clone(),
            interval: self.bot.interval.clone(),
            strategy: self.strategy.name().to_string(),
            position: self.position,
            last_decision: self.last_decision,
            total_candles: self.window.total_candles(),
            calibration: self.calibration,
            window: self.window.to_vec(),
        });
    }
}
