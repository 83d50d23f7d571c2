use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use common::{Candle, Config, Error, KlineTick, MarketData, Result};

use crate::runtime::StrategyRuntime;

/// Timing of a connector's sessions.
#[derive(Debug, Clone, Copy)]
pub struct ConnectorSettings {
    /// Fixed pause before reconnecting after a failed or ended session.
    pub reconnect_delay: Duration,
    /// Period of the uptime log line.
    pub heartbeat_interval: Duration,
    /// Sessions are rotated before they reach this age.
    pub max_session: Duration,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5 * 60),
            max_session: Duration::from_secs(23 * 3600 + 55 * 60),
        }
    }
}

impl ConnectorSettings {
    /// Every duration must be non-zero: a zero heartbeat period cannot be
    /// scheduled, and a zero session age or delay reconnects in a tight loop.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("reconnect delay", self.reconnect_delay),
            ("heartbeat interval", self.heartbeat_interval),
            ("max session", self.max_session),
        ] {
            if value.is_zero() {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

impl TryFrom<&Config> for ConnectorSettings {
    type Error = Error;

    fn try_from(cfg: &Config) -> Result<Self> {
        let settings = Self {
            reconnect_delay: cfg.reconnect_delay,
            heartbeat_interval: cfg.heartbeat_interval,
            max_session: cfg.max_session,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// A candle finished by its interval's final tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedCandle {
    pub candle: Candle,
    /// Exchange close time of the kline, in milliseconds.
    pub close_time_ms: i64,
}

/// Folds partial kline ticks into one candle per interval.
#[derive(Debug, Default)]
pub struct CandleBuilder {
    current: Option<Candle>,
}

impl CandleBuilder {
    /// Returns the finished candle when `tick` is the interval's final one.
    pub fn push(&mut self, tick: KlineTick) -> Option<ClosedCandle> {
        let candle = self.current.get_or_insert(Candle {
            open: tick.open,
            high: tick.high,
            low: tick.low,
            close: tick.close,
            volume: tick.volume,
            time: tick.close_time_ms / 1000,
        });
        candle.high = candle.high.max(tick.high);
        candle.low = candle.low.min(tick.low);
        candle.close = tick.close;
        candle.volume = tick.volume;
        candle.time = tick.close_time_ms / 1000;

        if !tick.is_final {
            return None;
        }
        self.current.take().map(|candle| ClosedCandle { candle, close_time_ms: tick.close_time_ms })
    }
}

enum SessionEnd {
    Stopped,
    /// Max session age reached; reconnect right away.
    Rotated,
    /// The server closed the stream.
    Closed,
}

/// Drives one bot: backfill, live subscription, candle aggregation and
/// reconnects, until its stop token is cancelled.
pub struct MarketDataConnector {
    runtime: StrategyRuntime,
    market: Arc<dyn MarketData>,
    settings: ConnectorSettings,
    stop: CancellationToken,
}

impl MarketDataConnector {
    /// Fails with a configuration error when `settings` are invalid.
    pub fn new(
        runtime: StrategyRuntime,
        market: Arc<dyn MarketData>,
        settings: ConnectorSettings,
        stop: CancellationToken,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self { runtime, market, settings, stop })
    }

    /// Run until stopped. Call this inside a `tokio::spawn`.
    pub async fn run(mut self) -> StrategyRuntime {
        let bot_id = self.runtime.bot().id;
        let symbol = self.runtime.bot().symbol.clone();
        info!(%bot_id, %symbol, interval = %self.runtime.bot().interval, "connector starting");

        self.runtime.restore_position().await;

        while !self.stop.is_cancelled() {
            match self.session().await {
                Ok(SessionEnd::Stopped) => break,
                Ok(SessionEnd::Rotated) => {
                    info!(%bot_id, %symbol, "max session age reached, reconnecting");
                    continue;
                }
                Ok(SessionEnd::Closed) => {
                    warn!(%bot_id, %symbol, delay = ?self.settings.reconnect_delay, "stream closed, reconnecting");
                }
                Err(e) => {
                    warn!(%bot_id, %symbol, error = %e, delay = ?self.settings.reconnect_delay, "session failed, reconnecting");
                }
            }

            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = sleep(self.settings.reconnect_delay) => {}
            }
        }

        info!(%bot_id, %symbol, "connector stopped");
        self.runtime
    }

    async fn session(&mut self) -> Result<SessionEnd> {
        self.backfill().await?;

        let bot = self.runtime.bot();
        let (symbol, interval) = (bot.symbol.clone(), bot.interval.clone());
        let mut ticks = tokio::select! {
            _ = self.stop.cancelled() => return Ok(SessionEnd::Stopped),
            ticks = self.market.subscribe(&symbol, &interval) => ticks?,
        };

        let started = Instant::now();
        let hb = self.settings.heartbeat_interval;
        let mut heartbeat = interval_at(started + hb, hb);
        let rotate = sleep(self.settings.max_session);
        tokio::pin!(rotate);
        let mut builder = CandleBuilder::default();

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => return Ok(SessionEnd::Stopped),
                _ = &mut rotate => return Ok(SessionEnd::Rotated),
                _ = heartbeat.tick() => {
                    debug!(
                        %symbol,
                        uptime_secs = started.elapsed().as_secs(),
                        candles = self.runtime.window().total_candles(),
                        "connector heartbeat"
                    );
                }
                item = ticks.next() => match item {
                    Some(Ok(tick)) => {
                        if let Some(closed) = builder.push(tick) {
                            self.on_closed_candle(closed).await;
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => return Ok(SessionEnd::Closed),
                },
            }
        }
    }

    /// Prime the window with the latest closed candles. Candles not newer
    /// than what the window already holds are skipped, so a reconnect never
    /// duplicates history.
    async fn backfill(&mut self) -> Result<()> {
        let bot = self.runtime.bot();
        let (symbol, interval) = (bot.symbol.clone(), bot.interval.clone());
        let limit = self.runtime.window().capacity();

        let candles = self.market.historical_candles(&symbol, &interval, limit).await?;
        let mut added = 0usize;
        for candle in candles {
            if self.is_stale(&candle) {
                continue;
            }
            self.runtime.update_candle(candle);
            added += 1;
        }
        info!(%symbol, %interval, added, total = self.runtime.window().total_candles(), "backfill complete");

        if self.runtime.is_flat() {
            self.runtime.calibrate_last_entry();
        }
        Ok(())
    }

    async fn on_closed_candle(&mut self, closed: ClosedCandle) {
        let ClosedCandle { candle, close_time_ms } = closed;
        if self.is_stale(&candle) {
            debug!(time = candle.time, "skipping candle already in window");
            return;
        }
        self.runtime.update_candle(candle);
        self.runtime.publish_candle(&candle);
        self.runtime.evaluate(close_time_ms).await;
    }

    fn is_stale(&self, candle: &Candle) -> bool {
        self.runtime.last_candle_time().is_some_and(|last| candle.time <= last)
    }
}
