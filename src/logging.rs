//! Инициализация `tracing` для демо и тестов.
//!
//! Библиотека сама ничего не инициализирует, только пишет события
//! через макросы `tracing`. Подписчика ставит приложение:
//!
//! ```no_run
//! multiqueue_pool::logging::init_default();
//! ```

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub json_format: bool,
    /// Имена потоков полезны: по ним видно, какой воркер что делает
    pub show_thread_names: bool,
    /// Доп. директивы вида "multiqueue_pool=trace,other=warn"
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_thread_names: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

/// Ставит глобальный подписчик. Повторные вызовы ничего не делают.
/// `RUST_LOG` учитывается поверх `config.level`.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

        if let Some(filters) = config.target_filters.as_deref() {
            for filter in filters.split(',') {
                if let Ok(directive) = filter.trim().parse() {
                    env_filter = env_filter.add_directive(directive);
                }
            }
        }

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = if config.json_format {
            registry
                .with(fmt::layer().json().flatten_event(true).with_thread_names(config.show_thread_names))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_thread_names(config.show_thread_names))
                .try_init()
        };

        if let Err(err) = result {
            eprintln!("Error setting global tracing subscriber: {}", err);
        }
    });
}

pub fn init_default() {
    init(LogConfig::default());
}
