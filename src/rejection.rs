use super::{
    handle::Task,
    pool::ThreadPool,
};


/// Политика для задач, которые не поместились в выбранную очередь.
///
/// Вызывается синхронно в потоке, который делал `execute`/`submit`,
/// ровно один раз на каждую отклонённую задачу. `pool` может быть `None`,
/// если отказ произошёл вне контекста пула.
pub trait RejectionPolicy: Send + Sync {
    fn rejected(&self, task: Task, pool: Option<&ThreadPool>);
}


/// Логирует отказ и выбрасывает задачу. Политика по умолчанию.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPolicy;

impl RejectionPolicy for LogPolicy {
    fn rejected(&self, _task: Task, _pool: Option<&ThreadPool>) {
        tracing::warn!("task was rejected due to overload");
    }
}


/// Считает отказ ошибкой: пишет `error!` и выбрасывает задачу
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortPolicy;

impl RejectionPolicy for AbortPolicy {
    fn rejected(&self, _task: Task, pool: Option<&ThreadPool>) {
        tracing::error!(
            queue_capacity = ?pool.map(|p| p.queue_capacity()),
            "task aborted: queue is full"
        );
    }
}


#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardPolicy;

impl RejectionPolicy for DiscardPolicy {
    fn rejected(&self, _task: Task, _pool: Option<&ThreadPool>) {
        tracing::debug!("rejected task discarded");
    }
}


/// Выполняет задачу прямо в вызывающем потоке, если пул ещё принимает работу
#[derive(Debug, Default, Clone, Copy)]
pub struct CallerRunsPolicy;

impl RejectionPolicy for CallerRunsPolicy {
    fn rejected(&self, task: Task, pool: Option<&ThreadPool>) {
        if pool.is_some_and(|p| p.is_shutdown()) {
            tracing::debug!("pool is shut down, rejected task discarded");
            return;
        }
        task();
    }
}


/// Политика из замыкания, см. [`from_fn`]
pub struct FnPolicy<F>(F);

impl<F> RejectionPolicy for FnPolicy<F>
where
    F: Fn(Task, Option<&ThreadPool>) + Send + Sync,
{
    #[inline]
    fn rejected(&self, task: Task, pool: Option<&ThreadPool>) {
        (self.0)(task, pool)
    }
}

pub fn from_fn<F>(f: F) -> FnPolicy<F>
where
    F: Fn(Task, Option<&ThreadPool>) + Send + Sync,
{
    FnPolicy(f)
}
