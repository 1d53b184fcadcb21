use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use interface::{Quote, Snapshot};

use crate::interfaces::{SnapshotRepository, StoreError};

const INIT_SQL: &str = include_str!("../sql/init.sql");
const MEMORY_PREFIX: &str = "sqlite::memory:";

#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: i64,
    asset: String,
    price: f64,
    market_cap: f64,
    change_24h: f64,
    captured_at_ms: i64,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let captured_at = DateTime::from_timestamp_millis(row.captured_at_ms)
            .ok_or(StoreError::Timestamp(row.captured_at_ms))?;

        Ok(Snapshot {
            id: row.id,
            asset: row.asset,
            price: row.price,
            market_cap: row.market_cap,
            change_24h: row.change_24h,
            captured_at,
        })
    }
}

#[derive(Clone)]
pub struct SqliteSnapshotRepository {
    pool: SqlitePool,
}

impl SqliteSnapshotRepository {
    /// 풀을 열고 스키마를 생성
    /// `sqlite::memory:`는 연결마다 별도 DB가 되므로 연결 하나를 계속 유지합니다
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = if database_url.starts_with(MEMORY_PREFIX) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;
        run_init_sql(&pool).await?;

        info!(url = database_url, "snapshot store initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// 저장 시각을 직접 지정하여 추가 (백필, 테스트 픽스처용)
    pub async fn append_at(
        &self,
        quote: &Quote,
        captured_at: DateTime<Utc>,
    ) -> Result<Snapshot, StoreError> {
        // DB에는 밀리초 단위로 저장되므로 반환값도 같은 정밀도로 맞춤
        let captured_at_ms = captured_at.timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO snapshots (asset, price, market_cap, change_24h, captured_at_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&quote.asset)
        .bind(quote.price)
        .bind(quote.market_cap)
        .bind(quote.change_24h)
        .bind(captured_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(Snapshot {
            id: result.last_insert_rowid(),
            asset: quote.asset.clone(),
            price: quote.price,
            market_cap: quote.market_cap,
            change_24h: quote.change_24h,
            captured_at: DateTime::from_timestamp_millis(captured_at_ms)
                .ok_or(StoreError::Timestamp(captured_at_ms))?,
        })
    }

    pub async fn count(&self, asset: &str) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snapshots WHERE asset = ?1")
            .bind(asset)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl SnapshotRepository for SqliteSnapshotRepository {
    async fn append(&self, quote: &Quote) -> Result<Snapshot, StoreError> {
        self.append_at(quote, Utc::now()).await
    }

    async fn latest(&self, asset: &str) -> Result<Option<Snapshot>, StoreError> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            "SELECT id, asset, price, market_cap, change_24h, captured_at_ms FROM snapshots WHERE asset = ?1 ORDER BY captured_at_ms DESC, id DESC LIMIT 1",
        )
        .bind(asset)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Snapshot::try_from).transpose()
    }

    async fn recent_prices(&self, asset: &str, limit: u32) -> Result<Vec<f64>, StoreError> {
        let prices: Vec<f64> = sqlx::query_scalar(
            "SELECT price FROM snapshots WHERE asset = ?1 ORDER BY captured_at_ms DESC, id DESC LIMIT ?2",
        )
        .bind(asset)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(prices)
    }
}

async fn run_init_sql(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in INIT_SQL.split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            continue;
        }
        sqlx::query(trimmed).execute(pool).await?;
    }
    Ok(())
}
