use super::errors::{PoolError, PoolResult};
use std::time::Duration;


/// Конфигурация пула. После создания пула не меняется.
#[derive(Debug, Clone)]
pub struct Config {
    /// Число core-воркеров, они не завершаются по простою
    pub core_size: usize,
    /// Максимум воркеров и одновременно число очередей
    pub max_size: usize,
    /// Ёмкость каждой очереди
    pub queue_capacity: usize,
    /// Сколько воркер ждёт задачу, прежде чем считать себя простаивающим.
    /// `0` допустим: лишние воркеры уходят сразу, а core-воркеры ждут
    /// задачу не меньше 1 мс за итерацию и не крутятся вхолостую.
    pub keep_alive: Duration,
    /// Минимум простаивающих воркеров, поддерживаемый при submit
    pub min_spare_threads: usize,
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            core_size: num_cpus,
            max_size: num_cpus * 2,
            queue_capacity: 64,
            keep_alive: Duration::from_secs(60),
            min_spare_threads: 1,
            thread_name_prefix: "pool-worker".to_string(),
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            core_size: num_cpus,
            max_size: num_cpus,
            queue_capacity: 256,
            min_spare_threads: 0,
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            core_size: num_cpus,
            max_size: num_cpus * 4,
            queue_capacity: 128,
            keep_alive: Duration::from_secs(30),
            min_spare_threads: num_cpus / 2,
            ..Default::default()
        }
    }

    pub fn with_sizes(mut self, core_size: usize, max_size: usize) -> Self {
        self.core_size = core_size;
        self.max_size = max_size;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_min_spare_threads(mut self, min_spare_threads: usize) -> Self {
        self.min_spare_threads = min_spare_threads;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> PoolResult<()> {
        if self.core_size == 0 {
            return Err(PoolError::InvalidConfig("core_size must be at least 1".into()));
        }
        if self.max_size < self.core_size {
            return Err(PoolError::InvalidConfig(format!(
                "max_size ({}) must be >= core_size ({})",
                self.max_size, self.core_size
            )));
        }
        if self.queue_capacity == 0 {
            return Err(PoolError::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        if self.min_spare_threads > self.max_size {
            return Err(PoolError::InvalidConfig(format!(
                "min_spare_threads ({}) must be <= max_size ({})",
                self.min_spare_threads, self.max_size
            )));
        }
        Ok(())
    }
}
