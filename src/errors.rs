use std::{io, time::Duration};
use thiserror::Error;


/// Ошибки пула: приём задач, конфигурация, создание потоков
#[derive(Debug, Error)]
pub enum PoolError {
    /// Пул уже закрыт (shutdown / shutdown_now)
    #[error("executor is shut down")]
    Rejected,

    #[error("queue #{queue} is full (capacity: {capacity})")]
    QueueFull { queue: usize, capacity: usize },

    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

impl PoolError {
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, PoolError::Rejected)
    }

    #[inline]
    pub fn is_queue_full(&self) -> bool {
        matches!(self, PoolError::QueueFull { .. })
    }
}

pub type PoolResult<T> = Result<T, PoolError>;


/// Исход задачи, запущенной через `submit`
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panic(String),

    /// Задача была выброшена без выполнения (политика отказа, drain_pending)
    #[error("task was discarded before it ran")]
    Discarded,

    #[error("task was cancelled")]
    Cancelled,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type TaskResult<T> = Result<T, TaskError>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_full_display() {
        let err = PoolError::QueueFull { queue: 3, capacity: 5 };
        assert!(err.is_queue_full());
        assert!(!err.is_rejected());
        assert_eq!(err.to_string(), "queue #3 is full (capacity: 5)");
    }

    #[test]
    fn test_spawn_from_io() {
        let err: PoolError = io::Error::new(io::ErrorKind::Other, "no threads left").into();
        assert!(matches!(err, PoolError::Spawn(_)));
        assert!(err.to_string().contains("no threads left"));
    }

    #[test]
    fn test_task_error_display() {
        let err = TaskError::Timeout(Duration::from_millis(250));
        assert!(err.to_string().contains("250ms"));
        assert_eq!(TaskError::Panic("boom".into()).to_string(), "task panicked: boom");
    }
}
