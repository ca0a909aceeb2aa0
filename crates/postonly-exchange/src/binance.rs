//! Binance USD-M futures REST binding.
//!
//! Public market data goes out unsigned; account and order endpoints are
//! signed with `ApiCredentials`. Error bodies are mapped onto
//! `ExchangeError` in one place (`wire::map_api_error`) so the engine never
//! sees a raw exchange code.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use postonly_core::{
    Bbo, ClientOrderId, Clock, Fill, OrderAck, OrderIntent, OrderKind, Position, Symbol,
    SymbolSpec, SystemClock,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::{BoxFuture, Exchange};
use crate::signer::{encode_query, ApiCredentials};
use crate::wire::{
    map_api_error, RawBookTicker, RawExchangeInfo, RawOrderResponse, RawPositionRisk,
    RawUserTrade, CODE_NO_MARGIN_TYPE_CHANGE, CODE_NO_POSITION_MODE_CHANGE,
};

const ORDER_PATH: &str = "/fapi/v1/order";
const TRADES_LIMIT: u32 = 1000;

/// Connection settings for the REST binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinanceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_recv_window_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            recv_window_ms: default_recv_window_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Binance USD-M futures client.
pub struct BinanceFutures {
    client: Client,
    base_url: String,
    credentials: ApiCredentials,
    recv_window_ms: u64,
    clock: Arc<dyn Clock>,
}

impl BinanceFutures {
    pub fn new(config: &BinanceConfig, credentials: ApiCredentials) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ExchangeError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            recv_window_ms: config.recv_window_ms,
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query = encode_query(params);
        let url = if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        };
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(format!("GET {path} failed: {e}")))?;
        Self::decode(path, response).await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query = self
            .credentials
            .signed_query(params, self.clock.now_ms(), self.recv_window_ms)?;
        let url = format!("{}{path}?{query}", self.base_url);
        debug!(%method, path, "Signed request");
        let response = self
            .client
            .request(method.clone(), &url)
            .header("X-MBX-APIKEY", self.credentials.api_key())
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(format!("{method} {path} failed: {e}")))?;
        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(format!("{path}: failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(map_api_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Decode(format!("{path}: {e}")))
    }

    async fn place(&self, params: Vec<(&str, String)>) -> ExchangeResult<OrderAck> {
        let raw: RawOrderResponse = self.signed(Method::POST, ORDER_PATH, &params).await?;
        Ok(OrderAck {
            cloid: ClientOrderId::from_string(raw.client_order_id),
            order_id: Some(raw.order_id),
        })
    }

    // ------------------------------------------------------------------
    // Account setup
    // ------------------------------------------------------------------

    pub async fn exchange_info(&self) -> ExchangeResult<RawExchangeInfo> {
        self.public_get("/fapi/v1/exchangeInfo", &[]).await
    }

    pub async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> ExchangeResult<()> {
        let params = [
            ("symbol", symbol.to_string()),
            ("leverage", leverage.to_string()),
        ];
        let _: serde_json::Value = self
            .signed(Method::POST, "/fapi/v1/leverage", &params)
            .await?;
        info!(%symbol, leverage, "Leverage set");
        Ok(())
    }

    /// Switch the symbol to isolated margin. Already isolated is success.
    pub async fn set_isolated_margin(&self, symbol: &Symbol) -> ExchangeResult<()> {
        let params = [
            ("symbol", symbol.to_string()),
            ("marginType", "ISOLATED".to_string()),
        ];
        match self
            .signed::<serde_json::Value>(Method::POST, "/fapi/v1/marginType", &params)
            .await
        {
            Ok(_) => {
                info!(%symbol, "Margin type set to isolated");
                Ok(())
            }
            Err(ExchangeError::Rejected { code, .. }) if code == CODE_NO_MARGIN_TYPE_CHANGE => {
                debug!(%symbol, "Margin already isolated");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Select one-way (`hedge = false`) or hedge position mode for the
    /// account. The engine assumes one-way mode.
    pub async fn set_position_mode(&self, hedge: bool) -> ExchangeResult<()> {
        let params = [("dualSidePosition", hedge.to_string())];
        match self
            .signed::<serde_json::Value>(Method::POST, "/fapi/v1/positionSide/dual", &params)
            .await
        {
            Ok(_) => {
                info!(hedge, "Position mode set");
                Ok(())
            }
            Err(ExchangeError::Rejected { code, .. }) if code == CODE_NO_POSITION_MODE_CHANGE => {
                debug!(hedge, "Position mode unchanged");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn order_params<'a>(intent: &OrderIntent, order_type: &'a str) -> Vec<(&'a str, String)> {
    vec![
        ("symbol", intent.symbol.to_string()),
        ("side", intent.side.as_wire().to_string()),
        ("type", order_type.to_string()),
        ("newClientOrderId", intent.cloid.to_string()),
    ]
}

impl Exchange for BinanceFutures {
    fn position<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<Position>> {
        Box::pin(async move {
            let rows: Vec<RawPositionRisk> = self
                .signed(
                    Method::GET,
                    "/fapi/v2/positionRisk",
                    &[("symbol", symbol.to_string())],
                )
                .await?;
            Ok(rows
                .into_iter()
                .find(|r| r.symbol == symbol.as_str())
                .map(|r| r.into_position(symbol.clone()))
                .unwrap_or_else(|| Position::flat(symbol.clone())))
        })
    }

    fn best_bid_ask<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<Bbo>> {
        Box::pin(async move {
            let raw: RawBookTicker = self
                .public_get("/fapi/v1/ticker/bookTicker", &[("symbol", symbol.to_string())])
                .await?;
            Ok(raw.into())
        })
    }

    fn place_maker_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>> {
        Box::pin(async move {
            let price = intent
                .price
                .ok_or_else(|| ExchangeError::Decode("maker order without price".into()))?;
            let mut params = order_params(intent, "LIMIT");
            params.push(("timeInForce", "GTX".to_string()));
            params.push(("quantity", intent.quantity.to_string()));
            params.push(("price", price.to_string()));
            if intent.reduce_only() {
                params.push(("reduceOnly", "true".to_string()));
            }
            self.place(params).await
        })
    }

    fn place_market_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>> {
        Box::pin(async move {
            let mut params = order_params(intent, "MARKET");
            params.push(("quantity", intent.quantity.to_string()));
            if intent.reduce_only() {
                params.push(("reduceOnly", "true".to_string()));
            }
            self.place(params).await
        })
    }

    fn place_trigger_close_order<'a>(
        &'a self,
        intent: &'a OrderIntent,
    ) -> BoxFuture<'a, ExchangeResult<OrderAck>> {
        Box::pin(async move {
            let order_type = match intent.kind {
                OrderKind::TakeProfit => "TAKE_PROFIT_MARKET",
                _ => "STOP_MARKET",
            };
            let trigger = intent
                .trigger_price
                .ok_or_else(|| ExchangeError::Decode("trigger order without stop price".into()))?;
            let mut params = order_params(intent, order_type);
            params.push(("stopPrice", trigger.to_string()));
            params.push(("closePosition", "true".to_string()));
            self.place(params).await
        })
    }

    fn cancel_order<'a>(
        &'a self,
        symbol: &'a Symbol,
        cloid: &'a ClientOrderId,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let params = [
                ("symbol", symbol.to_string()),
                ("origClientOrderId", cloid.to_string()),
            ];
            let _: serde_json::Value = self.signed(Method::DELETE, ORDER_PATH, &params).await?;
            Ok(())
        })
    }

    fn cancel_all_orders<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let _: serde_json::Value = self
                .signed(
                    Method::DELETE,
                    "/fapi/v1/allOpenOrders",
                    &[("symbol", symbol.to_string())],
                )
                .await?;
            Ok(())
        })
    }

    fn symbol_spec<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, ExchangeResult<SymbolSpec>> {
        Box::pin(async move { self.exchange_info().await?.symbol_spec(symbol) })
    }

    fn trade_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        since: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Fill>>> {
        Box::pin(async move {
            let mut params = vec![
                ("symbol", symbol.to_string()),
                ("limit", TRADES_LIMIT.to_string()),
            ];
            if let Some(since) = since {
                params.push(("startTime", since.timestamp_millis().to_string()));
            }
            let rows: Vec<RawUserTrade> = self
                .signed(Method::GET, "/fapi/v1/userTrades", &params)
                .await?;
            if rows.len() as u32 >= TRADES_LIMIT {
                warn!(%symbol, limit = TRADES_LIMIT, "Trade history truncated at page limit");
            }
            let mut fills = rows
                .into_iter()
                .map(|r| r.into_fill(symbol.clone()))
                .collect::<ExchangeResult<Vec<_>>>()?;
            fills.sort_by_key(|f| f.time);
            Ok(fills)
        })
    }
}
