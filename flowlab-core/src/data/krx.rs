//! KRX listing provider.
//!
//! Pulls the daily all-stocks table from the KRX market-data service
//! (data.krx.co.kr). The service speaks form-encoded POST requests keyed
//! by a `bld` screen id and returns JSON with comma-grouped numbers.
//!
//! The base table carries code, name, market name, and market cap but no
//! sector. Sector classification lives on a second screen; if that second
//! request fails the listing still succeeds, just without sectors — the
//! pipeline treats the sector column as optional throughout.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{FetchError, ListingProvider};
use crate::domain::SymbolMeta;

const ENDPOINT: &str = "http://data.krx.co.kr/comm/bldAttendant/getJsonData.cmd";
const REFERER: &str = "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader";

const LISTING_BLD: &str = "dbms/MDC/STAT/standard/MDCSTAT01501";
const SECTOR_BLD: &str = "dbms/MDC/STAT/standard/MDCSTAT03901";

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(rename = "OutBlock_1", default)]
    rows: Vec<ListingRow>,
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(rename = "ISU_SRT_CD")]
    code: String,
    #[serde(rename = "ISU_ABBRV")]
    name: String,
    #[serde(rename = "MKT_NM")]
    market: String,
    #[serde(rename = "MKTCAP", default)]
    market_cap: String,
}

#[derive(Debug, Deserialize)]
struct SectorResponse {
    #[serde(rename = "block1", default)]
    rows: Vec<SectorRow>,
}

#[derive(Debug, Deserialize)]
struct SectorRow {
    #[serde(rename = "ISU_SRT_CD")]
    code: String,
    #[serde(rename = "IDX_IND_NM")]
    sector: String,
}

pub struct KrxListingProvider {
    client: reqwest::blocking::Client,
    as_of: NaiveDate,
}

impl KrxListingProvider {
    /// `as_of` is the trade date the listing snapshot is requested for —
    /// normally the run date.
    pub fn new(as_of: NaiveDate) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self { client, as_of }
    }

    fn post(&self, params: &[(&str, &str)]) -> Result<String, FetchError> {
        let resp = self
            .client
            .post(ENDPOINT)
            .header("Referer", REFERER)
            .form(params)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    FetchError::NetworkUnreachable(e.to_string())
                } else {
                    FetchError::Listing(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Listing(format!("HTTP {status} from KRX")));
        }
        resp.text().map_err(|e| FetchError::Listing(e.to_string()))
    }

    fn trade_date(&self) -> String {
        self.as_of.format("%Y%m%d").to_string()
    }

    /// Parse the base listing. Rows without a market cap are dropped —
    /// they are suspended or data-less symbols the screener cannot rank.
    fn parse_listing(
        body: &str,
        sectors: &HashMap<String, String>,
    ) -> Result<Vec<SymbolMeta>, FetchError> {
        let parsed: ListingResponse = serde_json::from_str(body)
            .map_err(|e| FetchError::ResponseFormatChanged(format!("KRX listing: {e}")))?;

        let mut out = Vec::with_capacity(parsed.rows.len());
        for row in parsed.rows {
            let Some(market_cap) = parse_grouped_number(&row.market_cap) else {
                continue;
            };
            let sector = sectors.get(&row.code).cloned();
            out.push(SymbolMeta {
                code: row.code,
                name: row.name,
                market: row.market,
                market_cap,
                sector,
            });
        }
        Ok(out)
    }

    fn parse_sectors(body: &str) -> Result<HashMap<String, String>, FetchError> {
        let parsed: SectorResponse = serde_json::from_str(body)
            .map_err(|e| FetchError::ResponseFormatChanged(format!("KRX sectors: {e}")))?;
        Ok(parsed
            .rows
            .into_iter()
            .map(|r| (r.code, r.sector))
            .collect())
    }
}

impl ListingProvider for KrxListingProvider {
    fn name(&self) -> &str {
        "krx_listing"
    }

    fn fetch_listing(&self) -> Result<Vec<SymbolMeta>, FetchError> {
        let trd_dd = self.trade_date();

        // Sector table first; a miss degrades to sector-less metas.
        let sectors = match self.post(&[
            ("bld", SECTOR_BLD),
            ("locale", "ko_KR"),
            ("mktId", "STK"),
            ("trdDd", &trd_dd),
            ("money", "1"),
            ("csvxls_isNo", "false"),
        ]) {
            Ok(body) => Self::parse_sectors(&body).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "KRX sector table unparseable, continuing without sectors");
                HashMap::new()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "KRX sector table unavailable, continuing without sectors");
                HashMap::new()
            }
        };

        let body = self.post(&[
            ("bld", LISTING_BLD),
            ("locale", "ko_KR"),
            ("mktId", "ALL"),
            ("trdDd", &trd_dd),
            ("share", "1"),
            ("money", "1"),
            ("csvxls_isNo", "false"),
        ])?;

        let listing = Self::parse_listing(&body, &sectors)?;
        if listing.is_empty() {
            return Err(FetchError::Listing(format!(
                "KRX returned no rows for {trd_dd} (holiday or weekend?)"
            )));
        }
        Ok(listing)
    }
}

/// Parse a comma-grouped KRX number ("5,969,782,550"). Empty strings and
/// dashes mean the value is not available.
fn parse_grouped_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}
