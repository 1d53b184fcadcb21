use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
};

use chrono::Local;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Tracing guards를 보관하는 구조체
/// 이 구조체가 drop되기 전까지 로깅이 계속 작동합니다
pub struct TracingGuards {
    _file: Option<WorkerGuard>,
    _stdout: WorkerGuard,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Tracing 초기화
/// 파일 로깅과 stdout 로깅을 모두 설정합니다
pub fn init_tracing(log_dir: &str) -> io::Result<TracingGuards> {
    let (file_writer, file_guard) = daily_file_appender(log_dir, "oracle")?;
    let (stdout_writer, stdout_guard) = non_blocking(io::stdout());

    // 파일에는 INFO 이상만 기록
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(EnvFilter::new("info")),
        )
        .with(fmt::layer().with_writer(stdout_writer).with_ansi(true))
        .init();

    Ok(TracingGuards {
        _file: Some(file_guard),
        _stdout: stdout_guard,
    })
}

/// stdout만 사용 (대시보드 화면용)
pub fn init_stdout_tracing() -> TracingGuards {
    let (stdout_writer, stdout_guard) = non_blocking(io::stdout());

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(stdout_writer).with_ansi(true))
        .init();

    TracingGuards {
        _file: None,
        _stdout: stdout_guard,
    }
}

/// `logs/oracle.2025-11-29.log`
fn log_file_path(base_dir: &str, prefix: &str) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d").to_string();

    let mut path = PathBuf::from(base_dir);
    path.push(format!("{prefix}.{date}.log"));
    path
}

fn daily_file_appender(base_dir: &str, prefix: &str) -> io::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(base_dir)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(base_dir, prefix))?;

    Ok(non_blocking(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path("logs", "oracle");
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        assert!(path.starts_with("logs"));
        assert!(name.starts_with("oracle."));
        assert!(name.ends_with(".log"));
        // oracle.YYYY-MM-DD.log
        assert_eq!(name.len(), "oracle.".len() + 10 + ".log".len());
    }
}
