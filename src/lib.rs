//! Пул потоков с массивом ограниченных очередей
//!
//! # Features
//! - `max_size` независимых ограниченных FIFO-очередей, round robin при постановке
//! - Воркеры от `core_size` до `max_size`, лишние уходят после `keep_alive` простоя
//! - Поддержка минимума простаивающих воркеров (`min_spare_threads`)
//! - Подключаемая политика отказа при переполнении очереди
//! - `submit` с handle: результат, паника, отмена до старта
//! - Мягкий `shutdown` и жёсткий `shutdown_now`
//! - Метрики и мониторинг
//!
//! ```no_run
//! use multiqueue_pool::{rejection::LogPolicy, ThreadPoolInner};
//! use std::time::Duration;
//!
//! let pool = ThreadPoolInner::new(2, 4, 5, Duration::from_secs(5), 1, LogPolicy).unwrap();
//! pool.execute(|| println!("hello from the pool")).unwrap();
//! let answer = pool.submit(|| 6 * 7).unwrap();
//! assert_eq!(answer.join(), Ok(42));
//! pool.shutdown();
//! ```

pub mod config;
pub mod errors;
pub mod factory;
pub mod handle;
pub mod logging;
pub mod model;
pub mod pool;
pub mod queue;
pub mod rejection;
pub mod worker;

pub use config::Config;
pub use errors::{PoolError, PoolResult, TaskError, TaskResult};
pub use handle::{join_all, JoinHandle, Task};
pub use model::{Admission, PoolMetrics, PoolState, WorkerStatus};
pub use pool::{ThreadPool, ThreadPoolInner};
pub use rejection::RejectionPolicy;
