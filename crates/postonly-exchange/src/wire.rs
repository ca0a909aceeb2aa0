//! Binance USD-M futures REST payloads and their domain conversions.

use chrono::{DateTime, TimeZone, Utc};
use postonly_core::{Bbo, Fill, MarginType, OrderSide, Position, Price, Size, Symbol, SymbolSpec};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ExchangeError, ExchangeResult};

/// Post-only order rejected because it would execute as taker.
pub const CODE_WOULD_IMMEDIATELY_MATCH: i64 = -5022;
/// Margin type change requested while already in that mode.
pub const CODE_NO_MARGIN_TYPE_CHANGE: i64 = -4046;
/// Position mode already as requested.
pub const CODE_NO_POSITION_MODE_CHANGE: i64 = -4059;
pub const CODE_UNKNOWN_ORDER: i64 = -2011;
pub const CODE_ORDER_DOES_NOT_EXIST: i64 = -2013;
pub const CODE_INVALID_SYMBOL: i64 = -1121;
pub const CODE_TOO_MANY_REQUESTS: i64 = -1003;

// ============================================================================
// exchangeInfo
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RawExchangeInfo {
    pub symbols: Vec<RawSymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct RawSymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<RawFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum RawFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
    },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional {
        #[serde(default)]
        notional: Option<Decimal>,
        #[serde(rename = "minNotional", default)]
        min_notional: Option<Decimal>,
    },
    #[serde(other)]
    Other,
}

impl RawExchangeInfo {
    /// Spec for `symbol`; filters missing from the payload fall back to
    /// `SymbolSpec::default()`.
    pub fn symbol_spec(&self, symbol: &Symbol) -> ExchangeResult<SymbolSpec> {
        let info = self
            .symbols
            .iter()
            .find(|s| s.symbol == symbol.as_str())
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))?;
        Ok(parse_symbol_filters(&info.filters))
    }
}

pub fn parse_symbol_filters(filters: &[RawFilter]) -> SymbolSpec {
    let mut spec = SymbolSpec::default();
    for filter in filters {
        match filter {
            RawFilter::Price { tick_size } => spec.tick_size = Price::new(*tick_size),
            RawFilter::LotSize { step_size } => spec.step_size = Size::new(*step_size),
            RawFilter::MinNotional {
                notional,
                min_notional,
            } => {
                if let Some(value) = notional.or(*min_notional) {
                    spec.min_notional = value;
                }
            }
            RawFilter::Other => {}
        }
    }
    spec
}

// ============================================================================
// Account / market data
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPositionRisk {
    pub symbol: String,
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    #[serde(default)]
    pub leverage: Option<Decimal>,
    #[serde(default)]
    pub margin_type: Option<String>,
}

impl RawPositionRisk {
    pub fn into_position(self, symbol: Symbol) -> Position {
        let margin_type = match self.margin_type.as_deref() {
            Some(m) if m.eq_ignore_ascii_case("cross") => MarginType::Cross,
            _ => MarginType::Isolated,
        };
        let leverage = self.leverage.and_then(|l| l.to_u32()).unwrap_or_default();
        Position::from_exchange(symbol, self.position_amt, self.entry_price, leverage, margin_type)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBookTicker {
    pub symbol: String,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}

impl From<RawBookTicker> for Bbo {
    fn from(raw: RawBookTicker) -> Self {
        Bbo::new(Price::new(raw.bid_price), Price::new(raw.ask_price))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderResponse {
    pub order_id: u64,
    pub client_order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserTrade {
    pub symbol: String,
    pub order_id: u64,
    pub side: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub realized_pnl: Decimal,
    pub time: i64,
}

impl RawUserTrade {
    pub fn into_fill(self, symbol: Symbol) -> ExchangeResult<Fill> {
        let side = match self.side.as_str() {
            "BUY" => OrderSide::Buy,
            "SELL" => OrderSide::Sell,
            other => return Err(ExchangeError::Decode(format!("unknown trade side {other:?}"))),
        };
        let time: DateTime<Utc> = Utc
            .timestamp_millis_opt(self.time)
            .single()
            .ok_or_else(|| ExchangeError::Decode(format!("bad trade time {}", self.time)))?;
        Ok(Fill {
            symbol,
            side,
            quantity: Size::new(self.qty),
            price: Price::new(self.price),
            commission: self.commission,
            realized_pnl: self.realized_pnl,
            time,
            order_id: self.order_id,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RawApiError {
    pub code: i64,
    pub msg: String,
}

/// Map an error response onto the typed error.
pub fn map_api_error(http_status: u16, body: &str) -> ExchangeError {
    if http_status == 429 || http_status == 418 {
        return ExchangeError::RateLimited(format!("HTTP {http_status}: {body}"));
    }
    let Ok(raw) = serde_json::from_str::<RawApiError>(body) else {
        return ExchangeError::Transport(format!("HTTP {http_status}: {body}"));
    };
    match raw.code {
        CODE_WOULD_IMMEDIATELY_MATCH => ExchangeError::WouldImmediatelyMatch(raw.msg),
        CODE_UNKNOWN_ORDER | CODE_ORDER_DOES_NOT_EXIST => ExchangeError::OrderNotFound(raw.msg),
        CODE_INVALID_SYMBOL => ExchangeError::UnknownSymbol(raw.msg),
        CODE_TOO_MANY_REQUESTS => ExchangeError::RateLimited(raw.msg),
        code => ExchangeError::Rejected { code, msg: raw.msg },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const EXCHANGE_INFO: &str = r#"{
        "timezone": "UTC",
        "symbols": [
            {
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "filters": [
                    {"filterType": "PRICE_FILTER", "minPrice": "556.80", "maxPrice": "4529764", "tickSize": "0.10"},
                    {"filterType": "LOT_SIZE", "stepSize": "0.001", "maxQty": "1000", "minQty": "0.001"},
                    {"filterType": "MARKET_LOT_SIZE", "stepSize": "0.001", "maxQty": "120", "minQty": "0.001"},
                    {"filterType": "MIN_NOTIONAL", "notional": "100"},
                    {"filterType": "PERCENT_PRICE", "multiplierUp": "1.0500", "multiplierDown": "0.9500", "multiplierDecimal": "4"}
                ]
            },
            {
                "symbol": "XYZUSDT",
                "filters": [
                    {"filterType": "LOT_SIZE", "stepSize": "1"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_exchange_info_filters() {
        let info: RawExchangeInfo = serde_json::from_str(EXCHANGE_INFO).unwrap();
        let spec = info.symbol_spec(&Symbol::new("BTCUSDT").unwrap()).unwrap();
        assert_eq!(spec.tick_size.inner(), dec!(0.1));
        assert_eq!(spec.step_size.inner(), dec!(0.001));
        assert_eq!(spec.min_notional, dec!(100));
    }

    #[test]
    fn test_missing_filters_use_defaults() {
        let info: RawExchangeInfo = serde_json::from_str(EXCHANGE_INFO).unwrap();
        let spec = info.symbol_spec(&Symbol::new("XYZUSDT").unwrap()).unwrap();
        assert_eq!(spec.tick_size.inner(), dec!(0.01));
        assert_eq!(spec.step_size.inner(), dec!(1));
        assert_eq!(spec.min_notional, dec!(5));

        assert!(matches!(
            info.symbol_spec(&Symbol::new("NOPEUSDT").unwrap()),
            Err(ExchangeError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_min_notional_legacy_field() {
        let filters: Vec<RawFilter> =
            serde_json::from_str(r#"[{"filterType": "MIN_NOTIONAL", "minNotional": "10"}]"#).unwrap();
        assert_eq!(parse_symbol_filters(&filters).min_notional, dec!(10));
    }

    #[test]
    fn test_position_risk_conversion() {
        let raw: RawPositionRisk = serde_json::from_str(
            r#"{"symbol":"ETHUSDT","positionAmt":"-0.250","entryPrice":"2001.5","markPrice":"2000","leverage":"10","marginType":"isolated","positionSide":"BOTH"}"#,
        )
        .unwrap();
        let pos = raw.into_position(Symbol::new("ETHUSDT").unwrap());
        assert_eq!(pos.amount, dec!(-0.25));
        assert_eq!(pos.entry_price, Some(Price::new(dec!(2001.5))));
        assert_eq!(pos.leverage, 10);
        assert_eq!(pos.margin_type, MarginType::Isolated);
    }

    #[test]
    fn test_flat_position_has_no_entry() {
        let raw: RawPositionRisk = serde_json::from_str(
            r#"{"symbol":"ETHUSDT","positionAmt":"0.000","entryPrice":"0.0","leverage":"20","marginType":"cross"}"#,
        )
        .unwrap();
        let pos = raw.into_position(Symbol::new("ETHUSDT").unwrap());
        assert!(pos.amount.is_zero());
        assert_eq!(pos.entry_price, None);
        assert_eq!(pos.margin_type, MarginType::Cross);
    }

    #[test]
    fn test_user_trade_conversion() {
        let raw: RawUserTrade = serde_json::from_str(
            r#"{"buyer":false,"commission":"-0.07819010","commissionAsset":"USDT","id":698759,"maker":false,"orderId":25851813,"price":"7819.01","qty":"0.002","quoteQty":"15.63802","realizedPnl":"-0.91539999","side":"SELL","positionSide":"SHORT","symbol":"BTCUSDT","time":1569514978020}"#,
        )
        .unwrap();
        let fill = raw.into_fill(Symbol::new("BTCUSDT").unwrap()).unwrap();
        assert_eq!(fill.side, OrderSide::Sell);
        assert_eq!(fill.quantity.inner(), dec!(0.002));
        assert_eq!(fill.order_id, 25_851_813);
        assert_eq!(fill.time.timestamp_millis(), 1_569_514_978_020);
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_api_error(400, r#"{"code":-5022,"msg":"Due to the order could not be executed as maker, the Post Only order will be rejected."}"#),
            ExchangeError::WouldImmediatelyMatch(_)
        ));
        assert!(matches!(
            map_api_error(400, r#"{"code":-2011,"msg":"Unknown order sent."}"#),
            ExchangeError::OrderNotFound(_)
        ));
        assert!(matches!(
            map_api_error(400, r#"{"code":-2019,"msg":"Margin is insufficient."}"#),
            ExchangeError::Rejected { code: -2019, .. }
        ));
        assert!(matches!(map_api_error(429, ""), ExchangeError::RateLimited(_)));
        assert!(matches!(map_api_error(502, "<html>"), ExchangeError::Transport(_)));
    }
}
