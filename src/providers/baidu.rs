// =============================================================================
// Baidu Client — daily quotation fallback
// =============================================================================
//
// The narrowest vendor: daily bars only, served as a semicolon-joined row
// blob with a separate key list naming the comma-separated fields. Useful as
// a fallback when the richer vendors throttle.
// =============================================================================

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::engine::PricePoint;
use crate::providers::MarketProvider;
use crate::types::code_number;

const DOMAIN: &str = "https://finance.pae.baidu.com";

pub struct BaiduClient {
    client: reqwest::Client,
}

impl BaiduClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        debug!("baidu client initialised");

        Self { client }
    }
}

impl Default for BaiduClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the key list plus packed row blob into bars.
fn parse_market_data(keys: &[&str], blob: &str) -> Result<Vec<PricePoint>> {
    let col = |name: &str| -> Result<usize> {
        keys.iter()
            .position(|k| *k == name)
            .with_context(|| format!("quotation response missing key {name}"))
    };

    let ts_idx = col("time")?;
    let open_idx = col("open")?;
    let high_idx = col("high")?;
    let low_idx = col("low")?;
    let close_idx = col("close")?;
    let amount_idx = col("amount")?;

    let mut bars = Vec::new();
    for row in blob.split(';') {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() < keys.len().min(7) {
            continue;
        }
        let parse = |idx: usize| -> Option<f64> { fields.get(idx)?.parse().ok() };
        let date = fields
            .get(ts_idx)
            .and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok())
            .map(|d| d.and_hms_opt(15, 0, 0).expect("valid close time"));
        let (Some(date), Some(open), Some(high), Some(low), Some(close)) = (
            date,
            parse(open_idx),
            parse(high_idx),
            parse(low_idx),
            parse(close_idx),
        ) else {
            continue;
        };

        bars.push(PricePoint {
            date,
            open,
            high,
            low,
            close,
            amount: parse(amount_idx).unwrap_or(0.0),
        });
    }
    Ok(bars)
}

fn sorted_chronologically(mut bars: Vec<PricePoint>) -> Vec<PricePoint> {
    bars.sort_by_key(|b| b.date);
    bars
}

#[async_trait]
impl MarketProvider for BaiduClient {
    fn name(&self) -> &'static str {
        "baidu"
    }

    #[instrument(skip(self), name = "baidu::daily_bars")]
    async fn daily_bars(&self, code: &str, _end: NaiveDate) -> Result<Vec<PricePoint>> {
        let number = code_number(code);
        let url = format!("{DOMAIN}/vapi/v1/getquotation");
        let params: Vec<(&str, &str)> = vec![
            ("group", "quotation_kline_ab"),
            ("market_type", "ab"),
            ("newFormat", "1"),
            ("is_kc", "0"),
            ("ktype", "day"),
            ("query", number),
            ("code", number),
        ];

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .header("Accept", "application/vnd.finance-web.v1+json")
            .header("origin", "https://gushitong.baidu.com")
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse response from {url}"))?;
        if !status.is_success() {
            bail!("baidu GET {url} returned {status}: {body}");
        }

        let market = &body["Result"]["newMarketData"];
        let keys: Vec<&str> = market["keys"]
            .as_array()
            .context("quotation response missing Result.newMarketData.keys")?
            .iter()
            .filter_map(|k| k.as_str())
            .collect();
        let blob = market["marketData"]
            .as_str()
            .context("quotation response missing Result.newMarketData.marketData")?;

        Ok(sorted_chronologically(parse_market_data(&keys, blob)?))
    }
}
