//! GraphQL index client: compounding sessions and historical token prices.

use super::{DataSourceError, PriceSource, SessionSource};
use crate::domain::{CompoundSession, Decimal, PositionId};
use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Page size used when walking the session index.
pub const SESSION_PAGE_SIZE: usize = 1000;

/// Client for the compounder and exchange subgraphs.
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    client: Client,
    sessions_url: String,
    prices_url: String,
    page_size: usize,
}

impl SubgraphClient {
    pub fn new(sessions_url: String, prices_url: String) -> Self {
        Self {
            client: Client::new(),
            sessions_url,
            prices_url,
            page_size: SESSION_PAGE_SIZE,
        }
    }

    async fn post_query(
        &self,
        url: &str,
        query: String,
    ) -> Result<serde_json::Value, DataSourceError> {
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| DataSourceError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 429 {
            return Err(DataSourceError::RateLimited);
        }
        if !status.is_success() {
            return Err(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "GraphQL endpoint error".to_string(),
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| DataSourceError::ParseError(e.to_string()))?;

        if let Some(errors) = body.get("errors").and_then(|v| v.as_array()) {
            if !errors.is_empty() {
                // Indexer errors are usually temporary (resyncs, pruning).
                return Err(DataSourceError::Other(errors[0].to_string()));
            }
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| DataSourceError::ParseError("response without data".to_string()))
    }
}

#[async_trait]
impl SessionSource for SubgraphClient {
    async fn fetch_sessions(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CompoundSession>, DataSourceError> {
        let mut sessions = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current_from: u64 = 0;

        loop {
            debug!(current_from, to_block, "fetching session page");
            let query = format!(
                r#"{{ compoundSessions(first: {take}, where: {{ startBlockNumber_gte: {from}, startBlockNumber_lt: {to} }}, orderBy: startBlockNumber, orderDirection: asc) {{ id startBlockNumber endBlockNumber account token {{ id }} }} }}"#,
                take = self.page_size,
                from = current_from,
                to = to_block,
            );
            let data = self.post_query(&self.sessions_url, query).await?;
            let page = data
                .get("compoundSessions")
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    DataSourceError::ParseError("missing compoundSessions field".to_string())
                })?;

            let mut parsed = Vec::with_capacity(page.len());
            for session_json in page {
                parsed.push(parse_session(session_json)?);
            }
            let full_page = parsed.len() == self.page_size;
            let next_from = parsed.last().map(|s| s.start_block);

            let mut unseen = 0usize;
            for session in parsed {
                // Pages are keyed by start block, so overlaps happen.
                if seen.insert(session.id.clone()) {
                    sessions.push(session);
                    unseen += 1;
                }
            }

            match next_page_start(full_page, unseen, next_from) {
                Some(block) => current_from = block,
                None => break,
            }
        }

        // Sessions that ended before the window contribute nothing.
        sessions.retain(|s| s.end_block.map_or(true, |end| end > from_block));
        Ok(sessions)
    }
}

#[async_trait]
impl PriceSource for SubgraphClient {
    async fn fetch_prices(
        &self,
        token: Address,
        blocks: &[u64],
    ) -> Result<HashMap<u64, Decimal>, DataSourceError> {
        if blocks.is_empty() {
            return Ok(HashMap::new());
        }

        let token_id = token.to_string().to_lowercase();
        let fields: Vec<String> = blocks
            .iter()
            .map(|b| {
                format!(
                    r#"price_{b}: token(block: {{ number: {b} }}, id: "{token_id}") {{ derivedETH }}"#
                )
            })
            .collect();
        let query = format!("{{ {} }}", fields.join(" "));
        let data = self.post_query(&self.prices_url, query).await?;

        let mut prices = HashMap::with_capacity(blocks.len());
        for &block in blocks {
            let key = format!("price_{}", block);
            let price = match data.get(&key) {
                // Token absent from the price index: zero, not an error.
                None | Some(serde_json::Value::Null) => Decimal::zero(),
                Some(entry) => {
                    let derived = entry.get("derivedETH").and_then(|v| v.as_str()).ok_or_else(
                        || DataSourceError::ParseError(format!("missing derivedETH for {}", key)),
                    )?;
                    Decimal::from_str_canonical(derived).map_err(|e| {
                        DataSourceError::ParseError(format!("invalid price {}: {}", derived, e))
                    })?
                }
            };
            prices.insert(block, price);
        }
        Ok(prices)
    }
}

/// Start block of the next page, or `None` once the walk is done. A full
/// page with nothing unseen means every row shares one start block;
/// advancing the cursor would refetch the same page forever.
fn next_page_start(full_page: bool, unseen: usize, last_start: Option<u64>) -> Option<u64> {
    match last_start {
        Some(block) if full_page && unseen > 0 => Some(block),
        _ => None,
    }
}

fn parse_session(session_json: &serde_json::Value) -> Result<CompoundSession, DataSourceError> {
    let id = session_json
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("missing session id".to_string()))?
        .to_string();

    let start_block = parse_block(session_json.get("startBlockNumber"))?
        .ok_or_else(|| DataSourceError::ParseError("missing startBlockNumber".to_string()))?;
    let end_block = parse_block(session_json.get("endBlockNumber"))?;

    let account = session_json
        .get("account")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("missing account".to_string()))?
        .parse::<Address>()
        .map_err(|e| DataSourceError::ParseError(format!("invalid account: {}", e)))?;

    let token_id = session_json
        .get("token")
        .and_then(|t| t.get("id"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("missing token id".to_string()))?
        .parse::<u64>()
        .map_err(|e| DataSourceError::ParseError(format!("invalid token id: {}", e)))?;

    Ok(CompoundSession {
        id,
        position_id: PositionId::new(token_id),
        account,
        start_block,
        end_block,
    })
}

/// Block numbers arrive as strings or numbers depending on the indexer.
fn parse_block(value: Option<&serde_json::Value>) -> Result<Option<u64>, DataSourceError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| DataSourceError::ParseError(format!("invalid block {}", n))),
        Some(serde_json::Value::String(s)) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|e| DataSourceError::ParseError(format!("invalid block {}: {}", s, e))),
        Some(other) => Err(DataSourceError::ParseError(format!(
            "invalid block value {}",
            other
        ))),
    }
}
