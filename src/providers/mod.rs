// =============================================================================
// Market-Data Providers
// =============================================================================
//
// Each vendor exposes a different slice of the market: Eastmoney carries
// everything including 30-minute bars and industry boards, Xueqiu adds company
// profiles and cross-listing relations, Baidu serves daily bars only. The
// [`MarketProvider`] trait papers over the differences; operations a vendor
// does not offer fail with an explicit "not supported" error instead of being
// silently absent.
// =============================================================================

pub mod baidu;
pub mod eastmoney;
pub mod session;
pub mod xueqiu;

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::PricePoint;
use crate::runtime_config::RuntimeConfig;
use crate::types::KlineType;

/// Basic company profile for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    /// Vendor's industry classification label, empty when unknown.
    pub classification: String,
    /// Listing date in epoch milliseconds, when the vendor reports one.
    pub listed_at_ms: Option<i64>,
}

/// A quote related to an instrument, e.g. its Hong Kong cross-listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedQuote {
    pub symbol: String,
    pub name: String,
}

/// One industry board in the vendor's sector taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryBoard {
    pub code: String,
    pub name: String,
}

/// Unified market-data vendor interface. Implementations own their HTTP
/// client and any session state; they are cheap to share behind an `Arc`.
#[async_trait]
pub trait MarketProvider: Send + Sync {
    /// Vendor label used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Daily bars ending at `end`, oldest first.
    async fn daily_bars(&self, code: &str, end: NaiveDate) -> Result<Vec<PricePoint>>;

    /// Bars at an arbitrary granularity. Only some vendors serve intraday.
    async fn bars(&self, code: &str, kline: KlineType, end: NaiveDate) -> Result<Vec<PricePoint>> {
        match kline {
            KlineType::Day => self.daily_bars(code, end).await,
            _ => bail!("{} does not serve {} bars", self.name(), kline),
        }
    }

    /// Company profile for `code`.
    async fn company(&self, code: &str) -> Result<CompanyProfile> {
        let _ = code;
        bail!("{} does not serve company profiles", self.name())
    }

    /// Quotes related to `code` (cross-listings).
    async fn related_quotes(&self, code: &str) -> Result<Vec<RelatedQuote>> {
        let _ = code;
        bail!("{} does not serve related quotes", self.name())
    }

    /// The vendor's industry-board taxonomy.
    async fn industry_boards(&self) -> Result<Vec<IndustryBoard>> {
        bail!("{} does not serve industry boards", self.name())
    }

    /// Constituent instruments of one industry board.
    async fn industry_constituents(&self, board_code: &str) -> Result<Vec<RelatedQuote>> {
        let _ = board_code;
        bail!("{} does not serve industry constituents", self.name())
    }
}

/// Which vendor backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Eastmoney,
    Xueqiu,
    Baidu,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Eastmoney => write!(f, "eastmoney"),
            ProviderKind::Xueqiu => write!(f, "xueqiu"),
            ProviderKind::Baidu => write!(f, "baidu"),
        }
    }
}

/// Build the configured provider.
pub fn build(config: &RuntimeConfig) -> Arc<dyn MarketProvider> {
    match config.provider {
        ProviderKind::Eastmoney => Arc::new(eastmoney::EastmoneyClient::new(
            config.vendor_cookies.clone(),
            config.fetch_limit,
        )),
        ProviderKind::Xueqiu => Arc::new(xueqiu::XueqiuClient::new(
            config.xueqiu_token.clone(),
            config.fetch_limit,
        )),
        ProviderKind::Baidu => Arc::new(baidu::BaiduClient::new()),
    }
}
