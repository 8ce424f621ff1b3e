//! 로깅 초기화

use tracing_subscriber::EnvFilter;

/// `RUST_LOG`가 있으면 그 필터를, 없으면 `default_level`을 사용한다.
/// 이미 전역 구독자가 설치되어 있으면 아무 것도 하지 않는다.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("info");
        tracing::info!("✅ 로깅 초기화 확인");
    }
}
