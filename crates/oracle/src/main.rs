use std::sync::Arc;

use color_eyre::eyre;
use structopt::StructOpt;
use tracing::{info, warn};

use oracle::collector::{run_cycle, start_collect_loop};
use oracle::config::{CollectOpts, Command, ServeOpts};
use oracle::server::AppState;
use oracle::service::QueryService;
use oracle::{dashboard, logger};
use record::{SnapshotRepository, SqliteSnapshotRepository};
use sources::{CoinGeckoClient, PriceSource};

// lib.rs에서 자동으로 dotenv가 로드됨

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // init error reporting
    color_eyre::install()?;

    let cmd = Command::from_args();

    match cmd {
        Command::Serve(opts) => {
            let _guards = logger::init_tracing(&opts.collect.log_dir)?;
            run_server(opts).await
        }
        Command::FetchOnce(opts) => {
            let _guards = logger::init_tracing(&opts.log_dir)?;
            run_fetch_once(opts).await
        }
        Command::Dashboard(opts) => {
            let _guards = logger::init_stdout_tracing();
            dashboard::run_dashboard(opts).await
        }
    }
}

fn price_source(opts: &CollectOpts) -> Arc<dyn PriceSource> {
    Arc::new(CoinGeckoClient::with_base_url(
        &opts.source_url,
        &opts.vs_currency,
    ))
}

async fn run_server(opts: ServeOpts) -> eyre::Result<()> {
    info!("서버 시작 중...");

    let store = SqliteSnapshotRepository::connect(&opts.collect.store.database_url).await?;
    let repo: Arc<dyn SnapshotRepository> = Arc::new(store.clone());

    // start background collector (첫 수집은 즉시 실행)
    let collector = start_collect_loop(
        price_source(&opts.collect),
        repo.clone(),
        opts.collect.assets(),
        opts.interval(),
    );

    let service = QueryService::with_window(repo, opts.deviation_window);
    let state = Arc::new(AppState::new(service));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {}", e);
        }
        info!("종료 신호 수신, 서버를 정리합니다");
    };

    let result = oracle::server::serve(state, opts.port, shutdown).await;

    collector.abort();
    store.close().await;
    info!("서버 종료");

    result
}

async fn run_fetch_once(opts: CollectOpts) -> eyre::Result<()> {
    let store = SqliteSnapshotRepository::connect(&opts.store.database_url).await?;
    let source = price_source(&opts);

    let report = run_cycle(source.as_ref(), &store, &opts.assets()).await;
    store.close().await;

    let report = report?;
    info!(
        "수집 완료: {}개 저장, {}개 실패",
        report.stored, report.failed
    );

    Ok(())
}
