use futures_util::{future, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};
use url::Url;

use common::{Error, KlineTick, Result, TickStream};

/// Open a Binance kline WebSocket session for one (symbol, interval).
///
/// The returned stream yields every partial and final tick and ends when the
/// server closes the session.
pub(crate) async fn subscribe(ws_url: &str, symbol: &str, interval: &str) -> Result<TickStream> {
    let url_str = format!(
        "{}/{}@kline_{}",
        ws_url.trim_end_matches('/'),
        symbol.to_lowercase(),
        interval
    );
    let url = Url::parse(&url_str).map_err(|e| Error::WebSocket(e.to_string()))?;

    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| Error::WebSocket(e.to_string()))?;
    info!(symbol, interval, "kline stream connected");

    let ticks = ws_stream
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => match parse_kline_event(&text) {
                    Ok(Some(tick)) => Some(Ok(tick)),
                    Ok(None) => None, // non-kline message, skip
                    Err(e) => {
                        warn!(error = %e, "failed to parse kline event");
                        None
                    }
                },
                Ok(_) => None,
                Err(e) => Some(Err(Error::WebSocket(e.to_string()))),
            })
        });

    Ok(ticks.boxed())
}

// ─── Binance kline JSON parsing ──────────────────────────────────────────────

#[derive(Deserialize)]
struct KlineWrapper {
    k: KlineData,
}

#[derive(Deserialize)]
struct KlineData {
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "v")]
    volume: String,
    #[serde(rename = "x")]
    is_final: bool,
    #[serde(rename = "T")]
    close_time_ms: i64,
}

/// Parse one stream message. `Ok(None)` for anything that is not a kline event.
pub fn parse_kline_event(text: &str) -> Result<Option<KlineTick>> {
    // Kline messages have an "e" field set to "kline"
    let wrapper: serde_json::Value = serde_json::from_str(text)?;
    if wrapper.get("e").and_then(|v| v.as_str()) != Some("kline") {
        return Ok(None);
    }

    let k = serde_json::from_value::<KlineWrapper>(wrapper)?.k;
    Ok(Some(KlineTick {
        open: parse_price(&k.open)?,
        high: parse_price(&k.high)?,
        low: parse_price(&k.low)?,
        close: parse_price(&k.close)?,
        volume: parse_price(&k.volume)?,
        is_final: k.is_final,
        close_time_ms: k.close_time_ms,
    }))
}

pub(crate) fn parse_price(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::Exchange(format!("invalid number '{raw}': {e}")))
}
