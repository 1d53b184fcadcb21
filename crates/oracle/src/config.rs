use std::time::Duration;

use structopt::StructOpt;

// lib.rs에서 .env가 먼저 로드되므로 env 값은 .env 파일로도 지정 가능

#[derive(Debug, StructOpt)]
#[structopt(name = "oracle", about = "암호화폐 시세 수집 및 조회 서버")]
pub enum Command {
    /// 주기적 수집과 HTTP 서버 실행
    Serve(ServeOpts),
    /// 한 번만 수집하고 종료
    FetchOnce(CollectOpts),
    /// 터미널 대시보드
    Dashboard(DashboardOpts),
}

#[derive(Debug, Clone, StructOpt)]
pub struct StoreOpts {
    /// sqlx SQLite 연결 문자열
    #[structopt(long, env = "DATABASE_URL", default_value = "sqlite://crypto.db?mode=rwc")]
    pub database_url: String,
}

#[derive(Debug, Clone, StructOpt)]
pub struct CollectOpts {
    #[structopt(flatten)]
    pub store: StoreOpts,

    /// 수집할 자산 (쉼표 구분)
    #[structopt(long, env = "TRACKED_COINS", default_value = "bitcoin,matic-network,ethereum")]
    pub coins: String,

    #[structopt(long, env = "PRICE_SOURCE_URL", default_value = "https://api.coingecko.com/api/v3")]
    pub source_url: String,

    #[structopt(long, env = "VS_CURRENCY", default_value = "usd")]
    pub vs_currency: String,

    #[structopt(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: String,
}

impl CollectOpts {
    /// 공백과 빈 항목을 제거한 자산 목록
    pub fn assets(&self) -> Vec<String> {
        self.coins
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, StructOpt)]
pub struct ServeOpts {
    #[structopt(flatten)]
    pub collect: CollectOpts,

    #[structopt(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// 수집 간격 (초), 벽시계 기준으로 정렬됨
    #[structopt(long, env = "FETCH_INTERVAL_SECS", default_value = "7200")]
    pub interval_secs: u64,

    /// 표준편차 계산에 쓰는 최근 가격 수
    #[structopt(long, env = "DEVIATION_WINDOW", default_value = "100")]
    pub deviation_window: u32,
}

impl ServeOpts {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, StructOpt)]
pub struct DashboardOpts {
    #[structopt(long, env = "ORACLE_SERVER_URL", default_value = "http://localhost:8080")]
    pub server_url: String,

    /// 처음 선택할 자산
    #[structopt(long, default_value = "bitcoin")]
    pub coin: String,

    #[structopt(long, default_value = "30")]
    pub refresh_secs: u64,
}

impl DashboardOpts {
    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_options() {
        let cmd = Command::from_iter_safe([
            "oracle",
            "serve",
            "--database-url",
            "sqlite::memory:",
            "--port",
            "9090",
            "--interval-secs",
            "600",
            "--vs-currency",
            "eur",
        ])
        .unwrap();
        let Command::Serve(opts) = cmd else {
            panic!("expected serve");
        };

        assert_eq!(opts.port, 9090);
        assert_eq!(opts.interval(), Duration::from_secs(600));
        assert_eq!(opts.collect.vs_currency, "eur");
        assert_eq!(opts.collect.store.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_coins_are_split_and_trimmed() {
        let cmd = Command::from_iter_safe([
            "oracle",
            "fetch-once",
            "--coins",
            "bitcoin, ethereum,,solana",
        ])
        .unwrap();
        let Command::FetchOnce(opts) = cmd else {
            panic!("expected fetch-once");
        };

        assert_eq!(opts.assets(), vec!["bitcoin", "ethereum", "solana"]);
    }

    #[test]
    fn test_dashboard_options() {
        let cmd = Command::from_iter_safe([
            "oracle",
            "dashboard",
            "--coin",
            "ethereum",
            "--refresh-secs",
            "0",
        ])
        .unwrap();
        let Command::Dashboard(opts) = cmd else {
            panic!("expected dashboard");
        };

        assert_eq!(opts.coin, "ethereum");
        assert_eq!(opts.refresh(), Duration::from_secs(1));
    }
}
