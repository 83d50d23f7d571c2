use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{Candle, Error, MarketData, Result, TickStream};

use super::stream::{self, parse_price};

/// Public (unauthenticated) Binance market data: REST for prices and history,
/// WebSocket for live klines.
pub struct BinanceMarketData {
    rest_url: String,
    ws_url: String,
    http: Client,
}

impl BinanceMarketData {
    pub fn new(rest_url: impl Into<String>, ws_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            ws_url: ws_url.into(),
            http,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{path}", self.rest_url);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl MarketData for BinanceMarketData {
    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .get("/api/v3/ticker/price", &[("symbol", symbol.to_string())])
            .await?;
        let ticker: PriceTicker = serde_json::from_str(&body)?;
        parse_price(&ticker.price)
    }

    async fn historical_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        // one extra: the newest kline is usually still open and gets dropped
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", (limit + 1).min(1000).to_string()),
        ];
        let body = self.get("/api/v3/klines", &query).await?;
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(&body)?;
        let candles = closed_candles(&rows, Utc::now().timestamp_millis(), limit)?;
        debug!(symbol, interval, count = candles.len(), "fetched historical candles");
        Ok(candles)
    }

    async fn subscribe(&self, symbol: &str, interval: &str) -> Result<TickStream> {
        stream::subscribe(&self.ws_url, symbol, interval).await
    }
}

/// Convert raw kline rows into closed candles (time = close time in seconds),
/// keeping at most the newest `limit`.
fn closed_candles(rows: &[Vec<serde_json::Value>], now_ms: i64, limit: usize) -> Result<Vec<Candle>> {
    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let close_time_ms = row
            .get(6)
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| Error::Exchange("kline row without close time".to_string()))?;
        if close_time_ms > now_ms {
            continue;
        }
        candles.push(Candle {
            open: field(row, 1)?,
            high: field(row, 2)?,
            low: field(row, 3)?,
            close: field(row, 4)?,
            volume: field(row, 5)?,
            time: close_time_ms / 1000,
        });
    }
    let excess = candles.len().saturating_sub(limit);
    candles.drain(..excess);
    Ok(candles)
}

fn field(row: &[serde_json::Value], idx: usize) -> Result<f64> {
    let raw = row
        .get(idx)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::Exchange(format!("kline row missing field {idx}")))?;
    parse_price(raw)
}

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<serde_json::Value>> {
        serde_json::from_str(
            r#"[
                [0,      "1.0","2.0","0.5","1.5","10.0", 59999,  "0",1,"0","0","0"],
                [60000,  "1.5","2.5","1.0","2.0","11.0", 119999, "0",1,"0","0","0"],
                [120000, "2.0","3.0","1.5","2.5","12.0", 179999, "0",1,"0","0","0"]
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn drops_the_open_kline() {
        let candles = closed_candles(&rows(), 150_000, 10).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 2.0);
        assert_eq!(candles[1].time, 119);
    }

    #[test]
    fn keeps_newest_up_to_limit() {
        let candles = closed_candles(&rows(), 200_000, 2).unwrap();
        assert_eq!(candles.iter().map(|c| c.time).collect::<Vec<_>>(), vec![119, 179]);
    }

    #[test]
    fn malformed_row_is_an_error() {
        let rows: Vec<Vec<serde_json::Value>> =
            serde_json::from_str(r#"[[0, 1.0, "2.0", "0.5", "1.5", "10.0", 59999]]"#).unwrap();
        assert!(closed_candles(&rows, 100_000, 10).is_err());
    }
}
