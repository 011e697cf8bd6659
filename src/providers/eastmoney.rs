// =============================================================================
// Eastmoney Client — quote, kline, and industry-board endpoints
// =============================================================================
//
// The most complete of the vendors: daily and 30-minute bars, company basics,
// Hong Kong cross-listing lookup, and the industry-board taxonomy. Kline
// requests rotate through the configured session cookie pool; a failed request
// advances the pool and retries until every cookie has been tried once.
// =============================================================================

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, instrument, warn};

use crate::engine::PricePoint;
use crate::providers::session::SessionRotation;
use crate::providers::{CompanyProfile, IndustryBoard, MarketProvider, RelatedQuote};
use crate::types::{full_code, vendor_secid, vendor_secucode, KlineType};

const DATA_CENTER: &str = "https://datacenter.eastmoney.com";
const PUSH_QUOTE: &str = "https://push2.eastmoney.com";
const PUSH_HISTORY: &str = "https://push2his.eastmoney.com";

/// Vendor granularity codes for the kline endpoint.
fn klt(kline: KlineType) -> &'static str {
    match kline {
        KlineType::Day => "101",
        KlineType::Min30 => "30",
    }
}

pub struct EastmoneyClient {
    client: reqwest::Client,
    sessions: SessionRotation,
    fetch_limit: usize,
}

impl EastmoneyClient {
    pub fn new(cookies: Vec<String>, fetch_limit: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        debug!(cookie_pool = cookies.len().max(1), "eastmoney client initialised");

        Self {
            client,
            sessions: SessionRotation::new(cookies),
            fetch_limit,
        }
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
        cookie: &str,
    ) -> Result<serde_json::Value> {
        let mut req = self.client.get(url).query(params);
        if !cookie.is_empty() {
            req = req.header("Cookie", cookie);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse response from {url}"))?;

        if !status.is_success() {
            bail!("eastmoney GET {url} returned {status}: {body}");
        }
        Ok(body)
    }

    async fn fetch_klines(
        &self,
        code: &str,
        kline: KlineType,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let url = format!("{PUSH_HISTORY}/api/qt/stock/kline/get");
        let secid = vendor_secid(code);
        let end_param = end.format("%Y%m%d").to_string();
        let limit = self.fetch_limit.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("secid", &secid),
            ("end", &end_param),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61"),
            ("klt", klt(kline)),
            ("fqt", "1"),
            ("lmt", &limit),
        ];

        // Try each cookie in the pool once.
        let mut body = None;
        let mut last_err = None;
        for _ in 0..self.sessions.len() {
            let (idx, cookie) = {
                let (idx, cookie) = self.sessions.current();
                (idx, cookie.to_string())
            };
            match self.get_json(&url, &params, &cookie).await {
                Ok(v) => {
                    body = Some(v);
                    break;
                }
                Err(e) => {
                    warn!(code, cookie_index = idx, error = %e, "kline fetch failed, rotating session");
                    self.sessions.advance(idx);
                    last_err = Some(e);
                }
            }
        }
        let body = match body {
            Some(b) => b,
            None => return Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no session available"))),
        };

        let rows = body["data"]["klines"]
            .as_array()
            .with_context(|| format!("kline response for {code} missing data.klines"))?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(text) = row.as_str() else { continue };
            match parse_kline_row(text, kline) {
                Ok(bar) => bars.push(bar),
                Err(e) => warn!(code, row = text, error = %e, "skipping malformed kline row"),
            }
        }
        Ok(bars)
    }
}

/// One kline row is a comma-joined string:
/// `date,open,close,high,low,volume,amount,...`
fn parse_kline_row(row: &str, kline: KlineType) -> Result<PricePoint> {
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() < 7 {
        bail!("kline row has {} fields, expected at least 7", fields.len());
    }

    let date = parse_bar_time(fields[0], kline)?;
    let open: f64 = fields[1].parse().context("bad open")?;
    let close: f64 = fields[2].parse().context("bad close")?;
    let high: f64 = fields[3].parse().context("bad high")?;
    let low: f64 = fields[4].parse().context("bad low")?;
    let amount: f64 = fields[6].parse().context("bad amount")?;

    Ok(PricePoint {
        date,
        open,
        high,
        low,
        close,
        amount,
    })
}

/// Daily rows carry a bare date; the bar is stamped at the session close.
/// Intraday rows carry date and time.
fn parse_bar_time(text: &str, kline: KlineType) -> Result<NaiveDateTime> {
    match kline {
        KlineType::Day => {
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .with_context(|| format!("bad bar date {text}"))?;
            Ok(date.and_hms_opt(15, 0, 0).expect("valid close time"))
        }
        KlineType::Min30 => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M")
            .with_context(|| format!("bad bar time {text}")),
    }
}

#[async_trait]
impl MarketProvider for EastmoneyClient {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    #[instrument(skip(self), name = "eastmoney::daily_bars")]
    async fn daily_bars(&self, code: &str, end: NaiveDate) -> Result<Vec<PricePoint>> {
        self.fetch_klines(code, KlineType::Day, end).await
    }

    #[instrument(skip(self), name = "eastmoney::bars")]
    async fn bars(&self, code: &str, kline: KlineType, end: NaiveDate) -> Result<Vec<PricePoint>> {
        self.fetch_klines(code, kline, end).await
    }

    #[instrument(skip(self), name = "eastmoney::company")]
    async fn company(&self, code: &str) -> Result<CompanyProfile> {
        let url = format!("{DATA_CENTER}/securities/api/data/v1/get");
        let filter = format!("(SECUCODE=\"{}\")", vendor_secucode(code));
        let params: Vec<(&str, &str)> = vec![
            ("reportName", "RPT_F10_BASIC_ORGINFO"),
            ("columns", "ALL"),
            ("filter", &filter),
        ];
        let body = self.get_json(&url, &params, "").await?;

        let rows = body["result"]["data"]
            .as_array()
            .with_context(|| format!("org-info response for {code} missing result.data"))?;
        let Some(row) = rows.first() else {
            bail!("instrument {code} not found");
        };

        let name = row["SECURITY_NAME_ABBR"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let listed_at_ms = row["LISTING_DATE"]
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(&s[..10.min(s.len())], "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis());

        Ok(CompanyProfile {
            name,
            classification: String::new(),
            listed_at_ms,
        })
    }

    #[instrument(skip(self), name = "eastmoney::related_quotes")]
    async fn related_quotes(&self, code: &str) -> Result<Vec<RelatedQuote>> {
        let url = format!("{PUSH_QUOTE}/api/qt/stock/get");
        let secid = vendor_secid(code);
        let params: Vec<(&str, &str)> =
            vec![("fields", "f57,f58,f256"), ("secid", &secid)];
        let body = self.get_json(&url, &params, "").await?;

        // f256 carries the HK cross-listing symbol, f58 the display name.
        let hk_symbol = body["data"]["f256"].as_str().unwrap_or_default();
        let name = body["data"]["f58"].as_str().unwrap_or_default();
        if hk_symbol.is_empty() || name.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![RelatedQuote {
            symbol: hk_symbol.to_string(),
            name: name.to_string(),
        }])
    }

    #[instrument(skip(self), name = "eastmoney::industry_boards")]
    async fn industry_boards(&self) -> Result<Vec<IndustryBoard>> {
        let url = format!("{PUSH_QUOTE}/api/qt/clist/get");
        let params: Vec<(&str, &str)> = vec![
            ("fs", "m:90+t:2+f:!50"),
            ("fields", "f12,f14"),
            ("fid", "f13"),
            ("pn", "1"),
            ("pz", "200"),
        ];
        let body = self.get_json(&url, &params, "").await?;

        let mut boards = Vec::new();
        if let Some(rows) = body["data"]["diff"].as_array() {
            for row in rows {
                boards.push(IndustryBoard {
                    code: value_to_string(&row["f12"]),
                    name: value_to_string(&row["f14"]),
                });
            }
        }
        Ok(boards)
    }

    #[instrument(skip(self), name = "eastmoney::industry_constituents")]
    async fn industry_constituents(&self, board_code: &str) -> Result<Vec<RelatedQuote>> {
        let url = format!("{PUSH_QUOTE}/api/qt/clist/get");
        let fs = format!("b:{board_code}");
        let params: Vec<(&str, &str)> = vec![
            ("fs", &fs),
            ("fields", "f12,f14"),
            ("pn", "1"),
            ("pz", "1000"),
        ];
        let body = self.get_json(&url, &params, "").await?;

        let mut constituents = Vec::new();
        if let Some(rows) = body["data"]["diff"].as_array() {
            for row in rows {
                let number = value_to_string(&row["f12"]);
                // 200-prefixed constituents are HK-listed B shares; the boards
                // track mainland instruments only.
                if number.starts_with("200") {
                    continue;
                }
                constituents.push(RelatedQuote {
                    symbol: full_code(&number),
                    name: value_to_string(&row["f14"]),
                });
            }
        }
        Ok(constituents)
    }
}

/// The clist endpoint mixes string and numeric field encodings.
fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_daily_kline_row() {
        let row = "2024-03-08,10.00,10.50,10.80,9.90,123456,7890123.0,9.1,5.0,0.5,1.2";
        let bar = parse_kline_row(row, KlineType::Day).unwrap();
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.close, 10.5);
        assert_eq!(bar.high, 10.8);
        assert_eq!(bar.low, 9.9);
        assert_eq!(bar.amount, 7_890_123.0);
        assert_eq!(bar.date.format("%Y-%m-%d %H:%M").to_string(), "2024-03-08 15:00");
    }

    #[test]
    fn parses_intraday_kline_row() {
        let row = "2024-03-08 10:30,10.00,10.10,10.20,9.95,1000,50000.0";
        let bar = parse_kline_row(row, KlineType::Min30).unwrap();
        assert_eq!(bar.date.format("%H:%M").to_string(), "10:30");
    }

    #[test]
    fn rejects_truncated_row() {
        assert!(parse_kline_row("2024-03-08,10.0,10.5", KlineType::Day).is_err());
    }

    #[test]
    fn clist_values_stringify() {
        assert_eq!(value_to_string(&serde_json::json!("BK0478")), "BK0478");
        assert_eq!(value_to_string(&serde_json::json!(478)), "478");
        assert_eq!(value_to_string(&serde_json::Value::Null), "");
    }
}
