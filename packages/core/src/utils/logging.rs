// Логирование

use tracing_subscriber::EnvFilter;

/// Подключить консольный вывод tracing для хоста (CLI, тестовый стенд).
/// Уровень берётся из `RUST_LOG`, по умолчанию `info`.
/// Повторный вызов ничего не делает.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .try_init();
}
