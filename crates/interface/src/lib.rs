use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Assets tracked when nothing else is configured.
pub const DEFAULT_ASSETS: [&str; 3] = ["bitcoin", "matic-network", "ethereum"];

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("price source returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// One asset's market data as reported by a price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub asset: String,
    pub price: f64,
    pub market_cap: f64,
    pub change_24h: f64, // percent, 2.5 == +2.5%
}

/// A stored quote. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub asset: String,
    pub price: f64,
    pub market_cap: f64,
    pub change_24h: f64,
    pub captured_at: DateTime<Utc>,
}

/// Body of `GET /stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub price: f64,
    #[serde(rename = "marketCap")]
    pub market_cap: f64,
    #[serde(rename = "24hChange")]
    pub change_24h: f64,
}

impl From<&Snapshot> for StatsResponse {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            price: snapshot.price,
            market_cap: snapshot.market_cap,
            change_24h: snapshot.change_24h,
        }
    }
}

/// Body of `GET /deviation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationResponse {
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
