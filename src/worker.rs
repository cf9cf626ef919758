use super::{
    handle::{panic_message, Task},
    model::{PoolState, WorkerStatus},
    pool::ThreadPoolInner,
};
use crossbeam::channel::{select, Receiver};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Weak,
    },
    time::Duration,
};

/// Нижняя граница ожидания задачи, иначе при `keep_alive == 0` воркер крутится вхолостую
const MIN_IDLE_WAIT: Duration = Duration::from_millis(1);

/// Запись о живом воркере в реестре пула.
///
/// Статус пишет только сам воркер, пул его лишь читает (подсчёт idle).
/// Флаг `stop` наоборот: пишет пул при `shutdown_now`, читает воркер.
#[derive(Debug)]
pub struct WorkerRecord {
    id: usize,
    name: String,
    queue_index: usize,
    status: AtomicU8,
    stop: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Stopped,
    Retired,
    Disconnected,
}

impl WorkerRecord {
    pub(crate) fn new(id: usize, name: String, queue_index: usize) -> Self {
        Self {
            id,
            name,
            queue_index,
            status: AtomicU8::new(WorkerStatus::Idle as u8),
            stop: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn queue_index(&self) -> usize {
        self.queue_index
    }

    #[inline]
    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.status() == WorkerStatus::Idle
    }

    #[inline]
    fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    #[inline]
    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Основной цикл воркера, выполняется в собственном потоке.
    ///
    /// Пул держится через `Weak`: если все `ThreadPool` дропнуты без
    /// `shutdown`, очереди закрываются и воркер выходит по `Disconnected`.
    /// После `shutdown` пул сам держит себя живым, пока очереди не опустеют.
    /// `stop` ничего не передаёт, его закрытие будит воркер для выхода.
    pub(crate) fn run(
        &self,
        pool: Weak<ThreadPoolInner>,
        rx: Receiver<Task>,
        stop: Receiver<()>,
        keep_alive: Duration,
    ) {
        tracing::debug!(worker = %self.name, queue = self.queue_index, "worker started");
        let idle_wait = keep_alive.max(MIN_IDLE_WAIT);

        let exit = 'run: loop {
            if self.is_stopped() {
                break 'run Exit::Stopped;
            }
            match pool.upgrade() {
                Some(p) if p.state() != PoolState::Stopped => {}
                Some(_) => break 'run Exit::Stopped,
                None => break 'run Exit::Disconnected,
            }

            select! {
                recv(rx) -> msg => match msg {
                    Ok(task) => {
                        self.set_status(WorkerStatus::Busy);
                        tracing::trace!(worker = %self.name, "executing task");
                        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
                        self.set_status(WorkerStatus::Idle);

                        let failed = match outcome {
                            Ok(()) => false,
                            Err(payload) => {
                                tracing::error!(
                                    worker = %self.name,
                                    panic = %panic_message(payload.as_ref()),
                                    "task panicked"
                                );
                                true
                            }
                        };
                        match pool.upgrade() {
                            Some(p) => p.record_finished(failed),
                            None => break 'run Exit::Disconnected,
                        }
                    }
                    Err(_) => break 'run Exit::Disconnected,
                },
                // закрывается при shutdown_now и при дропе пула
                recv(stop) -> _ => break 'run Exit::Stopped,
                default(idle_wait) => {
                    let Some(p) = pool.upgrade() else {
                        break 'run Exit::Disconnected;
                    };
                    if p.try_retire(self.queue_index) {
                        tracing::debug!(worker = %self.name, "idle timeout, stopping");
                        break 'run Exit::Retired;
                    }
                }
            }
        };

        self.set_status(WorkerStatus::Terminated);
        if let Some(p) = pool.upgrade() {
            p.remove_worker(self, exit == Exit::Retired);
        }
        tracing::debug!(worker = %self.name, reason = ?exit, "worker terminated");
    }
}
