use async_trait::async_trait;
use thiserror::Error;

use interface::{Quote, Snapshot};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid stored timestamp: {0}")]
    Timestamp(i64),
}

/// 스냅샷 저장소
///
/// 쓰기는 append만 지원합니다. 한 번 기록된 스냅샷은 수정되거나 삭제되지 않습니다.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// 저장 시각을 현재 시각으로 하여 스냅샷 한 건을 추가
    async fn append(&self, quote: &Quote) -> Result<Snapshot, StoreError>;

    /// 해당 자산의 가장 최근 스냅샷
    async fn latest(&self, asset: &str) -> Result<Option<Snapshot>, StoreError>;

    /// 최근 가격을 최신순으로 최대 `limit`개
    async fn recent_prices(&self, asset: &str, limit: u32) -> Result<Vec<f64>, StoreError>;
}
