//! Signed HTTP client for the exchange: request signing, 429 retry,
//! pagination, and typed JSON decoding.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::auth::GatewayAuth;

const MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Validates a ticker/event/identifier used in a URL path: alphanumeric,
/// hyphen, underscore only, bounded length, no path-traversal shapes.
pub fn validate_identifier(id: &str, max_len: usize) -> GatewayResult<&str> {
    if id.is_empty() || id.len() > max_len {
        return Err(GatewayError::InvalidIdentifier(format!(
            "identifier length out of bounds: {}",
            id.len()
        )));
    }
    if id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err(GatewayError::InvalidIdentifier(
            "identifier contains path-traversal characters".into(),
        ));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(GatewayError::InvalidIdentifier(
            "identifier contains disallowed characters".into(),
        ));
    }
    Ok(id)
}

/// Signed, rate-limit-aware client for the exchange's REST API.
pub struct ExchangeGateway {
    http: Client,
    auth: GatewayAuth,
    base_url: String,
}

impl ExchangeGateway {
    pub fn new(base_url: impl Into<String>, auth: GatewayAuth) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(GatewayError::from)?;
        Ok(Self {
            http,
            auth,
            base_url: base_url.into(),
        })
    }

    /// Signed GET with no query string beyond what's already in `path`.
    /// `path` must be the *unsigned* portion used in the signature (no
    /// query string), with `query` appended only to the URL actually sent.
    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> GatewayResult<Option<T>> {
        let mut retry_after = DEFAULT_RETRY_AFTER_SECS;
        for attempt in 0..=MAX_RETRIES {
            let headers = self.auth.sign_request(method.as_str(), path);
            let url = format!("{}{}", self.base_url, path);
            let mut req = self.http.request(method.clone(), &url);
            for (key, value) in headers.as_tuples() {
                req = req.header(key, value);
            }
            if !query.is_empty() {
                req = req.query(query);
            }

            let resp = req.send().await.map_err(GatewayError::from)?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                retry_after = resp
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                if attempt == MAX_RETRIES {
                    return Err(GatewayError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                }
                warn!(retry_after, attempt, path, "rate limited, retrying");
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(GatewayError::Auth(format!("401 from {path}")));
            }

            if status == StatusCode::NO_CONTENT {
                return Ok(None);
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(GatewayError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let body: T = resp.json().await.map_err(GatewayError::from)?;
            return Ok(Some(body));
        }
        unreachable!("retry loop always returns or errors")
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, String)]) -> GatewayResult<T> {
        self.request(Method::GET, path, query)
            .await?
            .ok_or_else(|| GatewayError::Api {
                status: 204,
                message: format!("empty body from {path}"),
            })
    }

    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(&self, path: &str, body: &B) -> GatewayResult<T> {
        // The signed payload never includes the body; `reqwest::RequestBuilder::json`
        // only affects what's sent over the wire, not what's signed.
        let headers = self.auth.sign_request("POST", path);
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.post(&url).json(body);
        for (key, value) in headers.as_tuples() {
            req = req.header(key, value);
        }
        let resp = req.send().await.map_err(GatewayError::from)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        resp.json().await.map_err(GatewayError::from)
    }

    async fn delete(&self, path: &str) -> GatewayResult<()> {
        let headers = self.auth.sign_request("DELETE", path);
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.delete(&url);
        for (key, value) in headers.as_tuples() {
            req = req.header(key, value);
        }
        let resp = req.send().await.map_err(GatewayError::from)?;
        let status = resp.status();
        if !status.is_success() && status != StatusCode::NO_CONTENT {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(())
    }

    /// GET `/markets`, one page.
    pub async fn get_markets(
        &self,
        status: Option<&str>,
        limit: usize,
        cursor: Option<&str>,
    ) -> GatewayResult<MarketsPage> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(s) = status {
            query.push(("status", s.to_string()));
        }
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        let raw: RawMarketsResponse = self.get("/markets", &query).await?;
        Ok(MarketsPage {
            markets: raw.markets.unwrap_or_default().into_iter().map(Market::from).collect(),
            cursor: raw.cursor.filter(|c| !c.is_empty()),
        })
    }

    pub async fn get_market(&self, ticker: &str) -> GatewayResult<Market> {
        let ticker = validate_identifier(ticker, 64)?;
        let raw: RawMarketResponse = self.get(&format!("/markets/{ticker}"), &[]).await?;
        Ok(Market::from(raw.market))
    }

    pub async fn get_orderbook(&self, ticker: &str, depth: u32) -> GatewayResult<RawOrderbook> {
        let ticker = validate_identifier(ticker, 64)?;
        let path = format!("/markets/{ticker}/orderbook");
        let query = [("depth".to_string(), depth.min(100).to_string())];
        let raw: RawOrderbookResponse = self.get(&path, &query).await?;
        Ok(raw.orderbook.unwrap_or_default())
    }

    pub async fn get_balance(&self) -> GatewayResult<i64> {
        let raw: RawBalanceResponse = self.get("/portfolio/balance", &[]).await?;
        Ok(raw.balance.unwrap_or(0))
    }

    pub async fn get_positions(&self) -> GatewayResult<Vec<RawPosition>> {
        let raw: RawPositionsResponse = self.get("/portfolio/positions", &[]).await?;
        Ok(raw.market_positions.unwrap_or_default())
    }

    pub async fn place_order(&self, req: &PlaceOrderRequest) -> GatewayResult<String> {
        let resp: RawOrderResponse = self.post("/portfolio/orders", req).await?;
        resp.order
            .and_then(|o| o.order_id)
            .ok_or_else(|| GatewayError::Api {
                status: 0,
                message: "order response missing order_id".into(),
            })
    }

    pub async fn cancel_order(&self, order_id: &str) -> GatewayResult<()> {
        let order_id = validate_identifier(order_id, 128)?;
        self.delete(&format!("/portfolio/orders/{order_id}")).await
    }

    /// Cancels every resting order on the account.
    pub async fn cancel_all_orders(&self) -> GatewayResult<()> {
        self.delete("/portfolio/orders").await
    }

    pub async fn get_orders(&self, status: Option<&str>) -> GatewayResult<Vec<RawOrder>> {
        let query: Vec<(&str, String)> = status.map(|s| vec![("status", s.to_string())]).unwrap_or_default();
        let raw: RawOrdersResponse = self.get("/portfolio/orders", &query).await?;
        Ok(raw.orders.unwrap_or_default())
    }

    pub async fn get_fills(&self, ticker: Option<&str>) -> GatewayResult<Vec<RawFill>> {
        let query: Vec<(&str, String)> = ticker.map(|t| vec![("ticker", t.to_string())]).unwrap_or_default();
        let raw: RawFillsResponse = self.get("/portfolio/fills", &query).await?;
        Ok(raw.fills.unwrap_or_default())
    }

    /// GET `/events`, one page.
    pub async fn get_events(&self, series_ticker: Option<&str>, limit: usize, cursor: Option<&str>) -> GatewayResult<EventsPage> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(s) = series_ticker {
            query.push(("series_ticker", s.to_string()));
        }
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        let raw: RawEventsResponse = self.get("/events", &query).await?;
        Ok(EventsPage {
            events: raw.events.unwrap_or_default(),
            cursor: raw.cursor.filter(|c| !c.is_empty()),
        })
    }

    pub async fn get_event(&self, event_ticker: &str) -> GatewayResult<RawEvent> {
        let event_ticker = validate_identifier(event_ticker, 64)?;
        let raw: RawEventResponse = self.get(&format!("/events/{event_ticker}"), &[]).await?;
        Ok(raw.event)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawOrderbook {
    pub yes: Option<Vec<Vec<i64>>>,
    pub no: Option<Vec<Vec<i64>>>,
}

impl RawOrderbook {
    pub fn best_yes_bid(&self) -> i64 {
        self.yes.as_ref().and_then(|v| v.first()).and_then(|l| l.first()).copied().unwrap_or(0)
    }

    pub fn best_no_bid(&self) -> i64 {
        self.no.as_ref().and_then(|v| v.first()).and_then(|l| l.first()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct RawOrderbookResponse {
    orderbook: Option<RawOrderbook>,
}

#[derive(Debug, Deserialize)]
struct RawBalanceResponse {
    balance: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawPositionsResponse {
    market_positions: Option<Vec<RawPosition>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPosition {
    pub ticker: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawOrderResponse {
    order: Option<RawPlacedOrder>,
}

#[derive(Debug, Deserialize)]
struct RawPlacedOrder {
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrdersResponse {
    orders: Option<Vec<RawOrder>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub ticker: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFillsResponse {
    fills: Option<Vec<RawFill>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFill {
    pub ticker: Option<String>,
    pub order_id: Option<String>,
    pub count: Option<i64>,
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawEventsResponse {
    events: Option<Vec<RawEvent>>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEventResponse {
    event: RawEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub event_ticker: String,
    pub title: Option<String>,
    pub series_ticker: Option<String>,
}

/// One page of a paginated `/events` scan.
#[derive(Debug, Clone)]
pub struct EventsPage {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderRequest {
    pub ticker: String,
    pub action: &'static str,
    pub side: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_price: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_price: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RawMarketsResponse {
    markets: Option<Vec<RawMarket>>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMarketResponse {
    market: RawMarket,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMarket {
    ticker: String,
    title: Option<String>,
    yes_bid: Option<i64>,
    yes_ask: Option<i64>,
    last_price: Option<i64>,
    status: Option<String>,
}

/// A decoded market summary: only the fields the signal producers need.
#[derive(Debug, Clone)]
pub struct Market {
    pub ticker: String,
    pub title: String,
    pub yes_bid: Option<i64>,
    pub last_price: Option<i64>,
    pub status: Option<String>,
}

impl From<RawMarket> for Market {
    fn from(raw: RawMarket) -> Self {
        Self {
            ticker: raw.ticker,
            title: raw.title.unwrap_or_default(),
            yes_bid: raw.yes_bid.or(raw.yes_ask),
            last_price: raw.last_price,
            status: raw.status,
        }
    }
}

/// One page of a paginated `/markets` scan.
#[derive(Debug, Clone)]
pub struct MarketsPage {
    pub markets: Vec<Market>,
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal_identifiers() {
        assert!(validate_identifier("../etc/passwd", 64).is_err());
        assert!(validate_identifier("a/b", 64).is_err());
        assert!(validate_identifier("a\\b", 64).is_err());
    }

    #[test]
    fn rejects_overlong_identifiers() {
        let long = "A".repeat(200);
        assert!(validate_identifier(&long, 64).is_err());
    }

    #[test]
    fn accepts_well_formed_tickers() {
        assert!(validate_identifier("KXBTC-26FEB02-B100000", 64).is_ok());
    }

    #[test]
    fn raw_orderbook_reads_best_bids() {
        let ob = RawOrderbook {
            yes: Some(vec![vec![40, 100]]),
            no: Some(vec![vec![55, 80]]),
        };
        assert_eq!(ob.best_yes_bid(), 40);
        assert_eq!(ob.best_no_bid(), 55);
    }

    #[test]
    fn raw_orderbook_defaults_to_zero_when_empty() {
        let ob = RawOrderbook::default();
        assert_eq!(ob.best_yes_bid(), 0);
        assert_eq!(ob.best_no_bid(), 0);
    }
}
