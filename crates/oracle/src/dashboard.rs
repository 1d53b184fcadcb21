use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use eyre::eyre;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use interface::{DeviationResponse, ErrorResponse, StatsResponse};

use crate::config::DashboardOpts;

/// 차트에 남기는 최근 가격 수
pub const HISTORY_LEN: usize = 20;

/// 서버가 응답하지 않을 때 한 번의 조회를 포기하는 시간
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Oracle 서버 조회 클라이언트
#[derive(Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: String,
}

impl DashboardClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("failed to build http client with timeout: {}", e);
                reqwest::Client::new()
            });

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        coin: &str,
    ) -> eyre::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(&[("coin", coin)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(eyre!("서버 응답 오류 ({}): {}", status, message));
        }

        Ok(response.json().await?)
    }

    pub async fn fetch_stats(&self, coin: &str) -> eyre::Result<StatsResponse> {
        self.get_json("/stats", coin).await
    }

    pub async fn fetch_deviation(&self, coin: &str) -> eyre::Result<DeviationResponse> {
        self.get_json("/deviation", coin).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub at: DateTime<Local>,
    pub price: f64,
}

/// 최근 N개 가격만 유지하는 고정 길이 기록
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, point: PricePoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }

    /// 한 글자짜리 막대로 그린 가격 추이
    pub fn sparkline(&self) -> String {
        let Some((min, max)) = self.range() else {
            return String::new();
        };
        let span = max - min;

        self.prices()
            .map(|p| {
                if span <= f64::EPSILON {
                    SPARK_CHARS[SPARK_CHARS.len() / 2]
                } else {
                    let idx = ((p - min) / span * (SPARK_CHARS.len() - 1) as f64).round() as usize;
                    SPARK_CHARS[idx.min(SPARK_CHARS.len() - 1)]
                }
            })
            .collect()
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        Some(self.prices().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p), hi.max(p))
        }))
    }
}

/// 화면에 그릴 상태
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub coin: String,
    pub stats: Option<StatsResponse>,
    pub deviation: Option<DeviationResponse>,
    pub history: PriceHistory,
    pub last_updated: Option<DateTime<Local>>,
    pub error: Option<String>,
}

impl DashboardState {
    pub fn new(coin: &str) -> Self {
        Self {
            coin: coin.to_string(),
            stats: None,
            deviation: None,
            history: PriceHistory::new(HISTORY_LEN),
            last_updated: None,
            error: None,
        }
    }

    /// 자산 변경 시 이전 기록은 버림
    pub fn select(&mut self, coin: &str) {
        self.coin = coin.to_string();
        self.stats = None;
        self.deviation = None;
        self.history.clear();
        self.error = None;
    }

    pub fn apply(&mut self, stats: StatsResponse, deviation: DeviationResponse, at: DateTime<Local>) {
        self.history.push(PricePoint {
            at,
            price: stats.price,
        });
        self.stats = Some(stats);
        self.deviation = Some(deviation);
        self.last_updated = Some(at);
        self.error = None;
    }

    pub fn fail(&mut self, reason: &str) {
        self.error = Some(format!(
            "Failed to fetch crypto data. Please try again later. ({reason})"
        ));
    }
}

pub fn format_usd(value: f64) -> String {
    let negative = value < 0.0;
    let cents = format!("{:.2}", value.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac)
}

/// 시가총액처럼 큰 값은 B/T 단위로 축약
pub fn format_compact_usd(value: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e12, "T"), (1e9, "B"), (1e6, "M")];

    for (scale, suffix) in UNITS {
        if value.abs() >= scale {
            return format!("${:.2}{}", value / scale, suffix);
        }
    }
    format_usd(value)
}

pub fn render(state: &DashboardState) -> String {
    let mut lines = vec![format!("=== {} ===", state.coin)];

    match &state.stats {
        Some(stats) => {
            let trend = if stats.change_24h >= 0.0 { "▲" } else { "▼" };
            lines.push(format!("  Current Price: {}", format_usd(stats.price)));
            lines.push(format!("  Market Cap:    {}", format_compact_usd(stats.market_cap)));
            lines.push(format!("  24h Change:    {} {:+.2}%", trend, stats.change_24h));
        }
        None => lines.push("  Loading latest data...".to_string()),
    }

    if let Some(deviation) = &state.deviation {
        lines.push(format!("  Std Deviation: {}", format_usd(deviation.deviation)));
    }

    if let Some((min, max)) = state.history.range() {
        lines.push(format!(
            "  Price History: {}  ({} - {}, {} pts)",
            state.history.sparkline(),
            format_usd(min),
            format_usd(max),
            state.history.len()
        ));
    }

    if let Some(at) = state.last_updated {
        lines.push(format!("  Last updated:  {}", at.format("%Y-%m-%d %H:%M:%S")));
    }

    if let Some(error) = &state.error {
        lines.push(format!("  ! {}", error));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

async fn refresh(client: &DashboardClient, state: &mut DashboardState) {
    let coin = state.coin.clone();
    let result = tokio::try_join!(client.fetch_stats(&coin), client.fetch_deviation(&coin));

    match result {
        Ok((stats, deviation)) => state.apply(stats, deviation, Local::now()),
        Err(e) => {
            warn!("dashboard refresh failed for {}: {}", coin, e);
            state.fail(&e.to_string());
        }
    }

    println!("{}", render(state));
}

/// 주기적으로 서버를 조회하여 화면을 갱신
/// 표준입력으로 자산 이름을 입력하면 즉시 전환하여 다시 조회합니다
pub async fn run_dashboard(opts: DashboardOpts) -> eyre::Result<()> {
    let client = DashboardClient::new(&opts.server_url);

    info!(
        "대시보드 시작: server={}, coin={}, {}초 간격",
        opts.server_url,
        opts.coin,
        opts.refresh().as_secs()
    );
    println!("자산 이름을 입력하면 전환됩니다 (예: ethereum), 종료는 Ctrl-C");

    let input = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {}", e);
        }
    };

    run_loop(
        &client,
        DashboardState::new(&opts.coin),
        opts.refresh(),
        input,
        shutdown,
    )
    .await?;

    info!("대시보드 종료");
    Ok(())
}

/// 대시보드 본체
///
/// `shutdown`은 루프 시작 전에 한 번만 고정되어 조회 중에도 계속 대기합니다.
/// 조회가 끝나지 않아도 `shutdown`이 완료되면 바로 마지막 상태를 돌려줍니다.
pub async fn run_loop<R, F>(
    client: &DashboardClient,
    mut state: DashboardState,
    every: Duration,
    mut input: Lines<R>,
    shutdown: F,
) -> eyre::Result<DashboardState>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut input_open = true;

    loop {
        let should_refresh = tokio::select! {
            biased;
            _ = &mut shutdown => return Ok(state),
            _ = ticker.tick() => true,
            line = input.next_line(), if input_open => match line? {
                Some(line) => {
                    let coin = line.trim();
                    if !coin.is_empty() && coin != state.coin {
                        state.select(coin);
                        ticker.reset();
                        true
                    } else {
                        false
                    }
                }
                None => {
                    input_open = false;
                    false
                }
            },
        };

        if should_refresh {
            tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(state),
                _ = refresh(client, &mut state) => {}
            }
        }
    }
}
