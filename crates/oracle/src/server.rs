use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use interface::ErrorResponse;

use crate::service::{QueryError, QueryService};

#[derive(Clone)]
pub struct AppState {
    pub service: QueryService,
}

impl AppState {
    pub fn new(service: QueryService) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
pub struct CoinQuery {
    coin: Option<String>,
}

impl CoinQuery {
    fn coin(&self) -> Option<&str> {
        self.coin.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn missing_coin() -> Response {
    error_response(StatusCode::BAD_REQUEST, "Missing coin parameter")
}

/// QueryError를 HTTP 응답으로 변환
/// 내부 오류의 상세 내용은 서버 로그에만 남깁니다
fn query_error_response(err: QueryError, not_found_message: &str) -> Response {
    match err {
        QueryError::NotFound(_) => error_response(StatusCode::NOT_FOUND, not_found_message),
        QueryError::Internal(e) => {
            error!("query failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// 최신 시세 조회
async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoinQuery>,
) -> Response {
    let Some(coin) = query.coin() else {
        return missing_coin();
    };

    match state.service.get_stats(coin).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => query_error_response(e, "Coin not found"),
    }
}

/// 최근 가격의 표준편차 조회
async fn deviation_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoinQuery>,
) -> Response {
    let Some(coin) = query.coin() else {
        return missing_coin();
    };

    match state.service.get_deviation(coin).await {
        Ok(deviation) => Json(deviation).into_response(),
        Err(e) => query_error_response(e, "No data found"),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/deviation", get(deviation_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API 서버 시작
/// `shutdown`이 완료되면 진행 중인 요청을 마친 뒤 종료합니다
pub async fn serve<F>(state: Arc<AppState>, port: u16, shutdown: F) -> eyre::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
