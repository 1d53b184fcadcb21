use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info, warn};

use interface::SourceError;
use record::SnapshotRepository;
use sources::PriceSource;

/// 한 번의 수집 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub stored: usize,
    pub failed: usize,
}

/// 시세를 한 번 조회하고 자산별로 저장
///
/// 조회 자체가 실패하면 에러를 돌려주고 아무것도 저장하지 않습니다.
/// 저장은 자산마다 독립적이라 한 자산의 실패가 나머지를 막지 않습니다.
pub async fn run_cycle(
    source: &dyn PriceSource,
    repo: &dyn SnapshotRepository,
    assets: &[String],
) -> Result<CycleReport, SourceError> {
    let quotes = source.fetch_quotes(assets).await?;

    for asset in assets {
        if !quotes.iter().any(|q| &q.asset == asset) {
            warn!(asset = %asset, source = source.name(), "asset missing from price source response");
        }
    }

    let mut report = CycleReport::default();

    for quote in &quotes {
        match repo.append(quote).await {
            Ok(snapshot) => {
                info!(
                    asset = %snapshot.asset,
                    price = snapshot.price,
                    market_cap = snapshot.market_cap,
                    change_24h = snapshot.change_24h,
                    "snapshot saved"
                );
                report.stored += 1;
            }
            Err(e) => {
                error!(asset = %quote.asset, "failed to save snapshot: {}", e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// `now` 이후 첫 번째 interval 경계 (Unix epoch 기준)
///
/// 2시간 간격이면 00:00, 02:00, 04:00 ... UTC에 맞춰집니다.
/// 표현할 수 없을 만큼 먼 경계면 `DateTime::MAX_UTC`를 돌려줍니다.
pub fn next_aligned_tick(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = i64::try_from(interval.as_millis())
        .unwrap_or(i64::MAX)
        .max(1);
    let now_ms = now.timestamp_millis();

    now_ms
        .div_euclid(step)
        .checked_add(1)
        .and_then(|n| n.checked_mul(step))
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn start_collect_loop(
    source: Arc<dyn PriceSource>,
    repo: Arc<dyn SnapshotRepository>,
    assets: Vec<String>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "데이터 수집 루프 시작: {}개 자산, {}초 간격, source={}",
            assets.len(),
            interval.as_secs(),
            source.name()
        );

        loop {
            match run_cycle(source.as_ref(), repo.as_ref(), &assets).await {
                Ok(report) => info!(
                    "데이터 수집 완료: {}개 저장, {}개 실패",
                    report.stored, report.failed
                ),
                Err(e) => warn!("price fetch error from {}: {}", source.name(), e),
            }

            // 수집이 경계를 넘겨 끝나면 그 틱은 버려짐
            let now = Utc::now();
            let next = next_aligned_tick(now, interval);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!("다음 수집 예정: {}", next);

            sleep(wait).await;
        }
    })
}
