//! Universe file — TOML-based offline listing.
//!
//! A universe file stands in for the live KRX listing when running
//! offline or against a curated symbol set. Same shape as the live
//! listing: code, name, sector, market cap, all per market.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::provider::{FetchError, ListingProvider};
use crate::domain::SymbolMeta;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseSymbol {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    pub market_cap: f64,
}

/// The complete offline universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseFile {
    pub market: String,
    pub symbols: Vec<UniverseSymbol>,
}

impl UniverseFile {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, FetchError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Listing(format!("read universe file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, FetchError> {
        toml::from_str(content)
            .map_err(|e| FetchError::ResponseFormatChanged(format!("parse universe TOML: {e}")))
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, FetchError> {
        toml::to_string_pretty(self)
            .map_err(|e| FetchError::Other(format!("serialize universe: {e}")))
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// A small curated KOSPI universe of liquid large-caps, for demo runs.
    pub fn default_kospi() -> Self {
        let symbol = |code: &str, name: &str, sector: &str, cap: f64| UniverseSymbol {
            code: code.into(),
            name: name.into(),
            sector: Some(sector.into()),
            market_cap: cap,
        };

        Self {
            market: "KOSPI".into(),
            symbols: vec![
                symbol("005930", "삼성전자", "전기전자", 4.47e14),
                symbol("000660", "SK하이닉스", "전기전자", 1.30e14),
                symbol("373220", "LG에너지솔루션", "전기전자", 9.0e13),
                symbol("207940", "삼성바이오로직스", "의약품", 5.5e13),
                symbol("005380", "현대차", "운수장비", 5.0e13),
                symbol("068270", "셀트리온", "의약품", 4.0e13),
                symbol("000270", "기아", "운수장비", 4.0e13),
                symbol("051910", "LG화학", "화학", 3.5e13),
                symbol("105560", "KB금융", "금융업", 3.0e13),
                symbol("035420", "NAVER", "서비스업", 3.0e13),
                symbol("005490", "POSCO홀딩스", "철강금속", 3.0e13),
                symbol("055550", "신한지주", "금융업", 2.5e13),
                symbol("015760", "한국전력", "전기가스업", 1.2e13),
                symbol("017670", "SK텔레콤", "통신업", 1.1e13),
            ],
        }
    }
}

impl ListingProvider for UniverseFile {
    fn name(&self) -> &str {
        "universe_file"
    }

    fn fetch_listing(&self) -> Result<Vec<SymbolMeta>, FetchError> {
        Ok(self
            .symbols
            .iter()
            .map(|s| SymbolMeta {
                code: s.code.clone(),
                name: s.name.clone(),
                market: self.market.clone(),
                market_cap: s.market_cap,
                sector: s.sector.clone(),
            })
            .collect())
    }
}
