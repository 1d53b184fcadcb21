use async_trait::async_trait;

use interface::{Quote, SourceError};

pub mod coingecko;

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// 요청한 자산들의 현재 시세를 한 번의 요청으로 조회
    /// 응답에 없거나 필드가 깨진 자산은 결과에서 빠집니다
    async fn fetch_quotes(&self, assets: &[String]) -> Result<Vec<Quote>, SourceError>;
}

// Convenience re-exports
pub use coingecko::CoinGeckoClient;
