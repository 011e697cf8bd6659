// =============================================================================
// Xueqiu Client — kline, company profile, and relation endpoints
// =============================================================================
//
// Xueqiu answers with a column-name / row-tuple table for klines, so every
// field is located by its column index rather than position. All endpoints
// require the session token cookie.
// =============================================================================

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use tracing::{debug, instrument};

use crate::engine::PricePoint;
use crate::providers::{CompanyProfile, MarketProvider, RelatedQuote};

const DOMAIN: &str = "https://stock.xueqiu.com";

pub struct XueqiuClient {
    client: reqwest::Client,
    token: String,
    fetch_limit: usize,
}

impl XueqiuClient {
    pub fn new(token: String, fetch_limit: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        debug!("xueqiu client initialised");

        Self {
            client,
            token,
            fetch_limit,
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{DOMAIN}{path}");
        let resp = self
            .client
            .get(&url)
            .query(params)
            .header("Cookie", &self.token)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse response from {url}"))?;

        if !status.is_success() {
            bail!("xueqiu GET {url} returned {status}: {body}");
        }
        Ok(body)
    }
}

/// Convert the column/item table of a kline response into bars.
fn parse_kline_table(data: &serde_json::Value) -> Result<Vec<PricePoint>> {
    let columns = data["column"]
        .as_array()
        .context("kline response missing data.column")?;
    let col = |name: &str| -> Result<usize> {
        columns
            .iter()
            .position(|c| c.as_str() == Some(name))
            .with_context(|| format!("kline response missing column {name}"))
    };

    let ts_idx = col("timestamp")?;
    let open_idx = col("open")?;
    let high_idx = col("high")?;
    let low_idx = col("low")?;
    let close_idx = col("close")?;
    let amount_idx = col("amount")?;

    let rows = data["item"]
        .as_array()
        .context("kline response missing data.item")?;

    let mut bars = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(fields) = row.as_array() else { continue };
        let num = |idx: usize| fields.get(idx).and_then(|v| v.as_f64());
        let ts_ms = fields.get(ts_idx).and_then(|v| v.as_i64());
        let (Some(ts_ms), Some(open), Some(high), Some(low), Some(close)) = (
            ts_ms,
            num(open_idx),
            num(high_idx),
            num(low_idx),
            num(close_idx),
        ) else {
            continue;
        };
        let date = DateTime::from_timestamp_millis(ts_ms)
            .with_context(|| format!("bad bar timestamp {ts_ms}"))?
            .naive_utc();

        bars.push(PricePoint {
            date,
            open,
            high,
            low,
            close,
            amount: num(amount_idx).unwrap_or(0.0),
        });
    }
    Ok(bars)
}

#[async_trait]
impl MarketProvider for XueqiuClient {
    fn name(&self) -> &'static str {
        "xueqiu"
    }

    #[instrument(skip(self), name = "xueqiu::daily_bars")]
    async fn daily_bars(&self, code: &str, end: NaiveDate) -> Result<Vec<PricePoint>> {
        let begin_ms = end
            .and_hms_opt(23, 59, 59)
            .expect("valid end time")
            .and_utc()
            .timestamp_millis()
            .to_string();
        // A negative count asks for that many bars backwards from `begin`.
        let count = format!("-{}", self.fetch_limit);
        let params: Vec<(&str, &str)> = vec![
            ("symbol", code),
            ("begin", &begin_ms),
            ("period", "day"),
            ("type", "before"),
            ("count", &count),
            ("indicator", "kline"),
        ];
        let body = self.get_json("/v5/stock/chart/kline.json", &params).await?;
        parse_kline_table(&body["data"])
    }

    #[instrument(skip(self), name = "xueqiu::company")]
    async fn company(&self, code: &str) -> Result<CompanyProfile> {
        let params: Vec<(&str, &str)> = vec![("symbol", code)];
        let body = self
            .get_json("/v5/stock/f10/cn/company.json", &params)
            .await?;

        let company = &body["data"]["company"];
        if company.is_null() {
            bail!("instrument {code} not found");
        }
        Ok(CompanyProfile {
            name: company["org_short_name_cn"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            classification: company["classi_name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            listed_at_ms: company["listed_date"].as_i64(),
        })
    }

    #[instrument(skip(self), name = "xueqiu::related_quotes")]
    async fn related_quotes(&self, code: &str) -> Result<Vec<RelatedQuote>> {
        let params: Vec<(&str, &str)> = vec![("symbol", code)];
        let body = self
            .get_json("/v5/stock/bar/relation.json", &params)
            .await?;

        let mut quotes = Vec::new();
        if let Some(items) = body["data"]["stock_item_list"].as_array() {
            for item in items {
                quotes.push(RelatedQuote {
                    symbol: item["symbol"].as_str().unwrap_or_default().to_string(),
                    name: item["name"].as_str().unwrap_or_default().to_string(),
                });
            }
        }
        Ok(quotes)
    }
}
