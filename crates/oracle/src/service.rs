use std::sync::Arc;

use thiserror::Error;

use interface::{DeviationResponse, StatsResponse};
use record::{SnapshotRepository, StoreError};

use crate::stats::{population_std_dev, round2};

/// 표준편차 계산에 쓰는 최근 가격 개수
pub const DEFAULT_DEVIATION_WINDOW: u32 = 100;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("no snapshot for asset {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

/// 저장된 스냅샷에 대한 읽기 전용 조회
#[derive(Clone)]
pub struct QueryService {
    repo: Arc<dyn SnapshotRepository>,
    deviation_window: u32,
}

impl QueryService {
    pub fn new(repo: Arc<dyn SnapshotRepository>) -> Self {
        Self::with_window(repo, DEFAULT_DEVIATION_WINDOW)
    }

    pub fn with_window(repo: Arc<dyn SnapshotRepository>, deviation_window: u32) -> Self {
        Self {
            repo,
            deviation_window: deviation_window.max(1),
        }
    }

    pub async fn get_stats(&self, asset: &str) -> Result<StatsResponse, QueryError> {
        let latest = self
            .repo
            .latest(asset)
            .await?
            .ok_or_else(|| QueryError::NotFound(asset.to_string()))?;

        Ok(StatsResponse::from(&latest))
    }

    pub async fn get_deviation(&self, asset: &str) -> Result<DeviationResponse, QueryError> {
        let prices = self
            .repo
            .recent_prices(asset, self.deviation_window)
            .await?;

        let deviation =
            population_std_dev(&prices).ok_or_else(|| QueryError::NotFound(asset.to_string()))?;

        Ok(DeviationResponse {
            deviation: round2(deviation),
        })
    }
}
