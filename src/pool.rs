use super::{
    config::Config,
    errors::{PoolError, PoolResult},
    factory::ThreadFactory,
    handle::{task_with_handle, JoinHandle, Task},
    model::{Admission, PoolMetrics, PoolState, WorkerSnapshot, WorkerStatus},
    queue::QueueArray,
    rejection::RejectionPolicy,
    worker::WorkerRecord,
};
use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;
use std::{
    sync::{
        atomic::{AtomicU8, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;


pub type ThreadPool = Arc<ThreadPoolInner>;

const TERMINATION_POLL: Duration = Duration::from_millis(5);


/// Пул потоков с массивом ограниченных очередей.
///
/// Очередей ровно `max_size`, каждая обслуживается максимум одним воркером.
/// Задачи распределяются по очередям round robin, воркеров от `core_size`
/// до `max_size`. Лишние воркеры завершаются после `keep_alive` простоя.
///
/// Воркеры держат пул через `Weak`, поэтому дроп последнего `ThreadPool`
/// без `shutdown` закрывает очереди и останавливает потоки. Задачи, которые
/// так и не начались, уходят в политику отказа.
/// После `shutdown` пул держит ссылку на себя, пока не дорабатает очереди.
pub struct ThreadPoolInner {
    config: Config,
    queues: QueueArray,
    workers: DashMap<usize, Arc<WorkerRecord>>,
    live_workers: AtomicUsize,
    next_worker_id: AtomicUsize,
    next_queue: AtomicUsize,
    state: AtomicU8,
    factory: ThreadFactory,
    rejection: Box<dyn RejectionPolicy>,
    stop_tx: Mutex<Option<Sender<()>>>,
    stop_rx: Receiver<()>,
    draining: Mutex<Option<ThreadPool>>,
    completed_tasks: AtomicUsize,
    failed_tasks: AtomicUsize,
    rejected_tasks: AtomicUsize,
}

impl ThreadPoolInner {
    pub fn new<P>(
        core_size: usize,
        max_size: usize,
        queue_capacity: usize,
        keep_alive: Duration,
        min_spare_threads: usize,
        rejection: P,
    ) -> PoolResult<ThreadPool>
    where
        P: RejectionPolicy + 'static,
    {
        let config = Config {
            core_size,
            max_size,
            queue_capacity,
            keep_alive,
            min_spare_threads,
            ..Default::default()
        };
        Self::with_config(config, rejection)
    }

    pub fn with_config<P>(config: Config, rejection: P) -> PoolResult<ThreadPool>
    where
        P: RejectionPolicy + 'static,
    {
        config.validate()?;
        let (stop_tx, stop_rx) = channel::bounded(0);

        let pool = Arc::new(ThreadPoolInner {
            queues: QueueArray::new(config.max_size, config.queue_capacity),
            workers: DashMap::with_capacity(config.max_size),
            live_workers: AtomicUsize::new(0),
            next_worker_id: AtomicUsize::new(0),
            next_queue: AtomicUsize::new(0),
            state: AtomicU8::new(PoolState::Running as u8),
            factory: ThreadFactory::new(config.thread_name_prefix.clone()),
            rejection: Box::new(rejection),
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
            draining: Mutex::new(None),
            completed_tasks: AtomicUsize::new(0),
            failed_tasks: AtomicUsize::new(0),
            rejected_tasks: AtomicUsize::new(0),
            config,
        });

        if let Err(e) = pool.prestart_core_workers() {
            pool.shutdown_now();
            return Err(e);
        }

        tracing::info!(
            core = pool.config.core_size,
            max = pool.config.max_size,
            queue_capacity = pool.config.queue_capacity,
            keep_alive = ?pool.config.keep_alive,
            min_spare = pool.config.min_spare_threads,
            "thread pool created"
        );

        Ok(pool)
    }

    /// Fire-and-forget. `Err(Rejected)` только если пул уже закрыт;
    /// переполненная очередь отдаёт задачу политике отказа и возвращает
    /// `Ok(Admission::Rejected)`.
    pub fn execute<F>(self: &Arc<Self>, work: F) -> PoolResult<Admission>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(work))
    }

    /// Как `execute`, но результат (или паника) доставляется через handle.
    /// Если задача ушла в политику отказа и та её выбросила, handle
    /// резолвится в `TaskError::Discarded`.
    pub fn submit<T, F>(self: &Arc<Self>, work: F) -> PoolResult<JoinHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.state() != PoolState::Running {
            return Err(PoolError::Rejected);
        }
        let (task, handle) = task_with_handle(work);
        self.enqueue(task)?;
        Ok(handle)
    }

    fn enqueue(self: &Arc<Self>, task: Task) -> PoolResult<Admission> {
        if self.state() != PoolState::Running {
            return Err(PoolError::Rejected);
        }

        let queue = self.next_queue.fetch_add(1, Ordering::Relaxed) % self.queues.len();

        match self.queues.try_push(queue, task) {
            Ok(()) => {
                tracing::debug!(queue, "task accepted");
                self.ensure_min_spare_threads();
                Ok(Admission::Queued { queue })
            }
            Err(task) => {
                self.rejected_tasks.fetch_add(1, Ordering::Relaxed);
                let reason = PoolError::QueueFull { queue, capacity: self.queues.capacity() };
                tracing::warn!(%reason, "task rejected");
                self.rejection.rejected(task, Some(self));
                Ok(Admission::Rejected { queue })
            }
        }
    }

    /// Если простаивающих воркеров меньше `min_spare_threads` и есть место,
    /// поднимает ровно одного воркера на свободной очереди.
    /// Эвристика: проверка идёт только при успешной постановке задачи.
    pub fn ensure_min_spare_threads(self: &Arc<Self>) {
        let idle = self.idle_count();
        if idle >= self.config.min_spare_threads || self.worker_count() >= self.config.max_size {
            return;
        }

        match self.spawn_on_unbound_queue() {
            Ok(Some(record)) => tracing::debug!(
                worker = %record.name(),
                queue = record.queue_index(),
                idle,
                "spawned spare worker"
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to spawn spare worker"),
        }
    }

    /// Поднимает воркеров, пока их не станет `core_size`. Возвращает
    /// сколько было создано.
    pub fn prestart_core_workers(self: &Arc<Self>) -> PoolResult<usize> {
        let mut started = 0;
        while self.state() == PoolState::Running && self.worker_count() < self.config.core_size {
            match self.spawn_on_unbound_queue()? {
                Some(_) => started += 1,
                None => break,
            }
        }
        Ok(started)
    }

    /// Воркер на конкретной очереди. `Ok(None)`, если пул уже на максимуме,
    /// индекс вне диапазона или у очереди уже есть воркер.
    pub fn spawn_worker(self: &Arc<Self>, queue_index: usize) -> PoolResult<Option<Arc<WorkerRecord>>> {
        if queue_index >= self.queues.len() || !self.reserve_slot() {
            return Ok(None);
        }
        if !self.queues.claim(queue_index) {
            self.live_workers.fetch_sub(1, Ordering::AcqRel);
            return Ok(None);
        }
        self.start_worker(queue_index).map(Some)
    }

    fn spawn_on_unbound_queue(self: &Arc<Self>) -> PoolResult<Option<Arc<WorkerRecord>>> {
        if !self.reserve_slot() {
            return Ok(None);
        }
        let Some(queue_index) = self.queues.claim_first_unbound() else {
            // уходящий воркер ещё не освободил свою очередь
            self.live_workers.fetch_sub(1, Ordering::AcqRel);
            return Ok(None);
        };
        self.start_worker(queue_index).map(Some)
    }

    #[inline]
    fn reserve_slot(&self) -> bool {
        let max = self.config.max_size;
        self.live_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .is_ok()
    }

    /// Слот и очередь уже зарезервированы вызывающим
    fn start_worker(self: &Arc<Self>, queue_index: usize) -> PoolResult<Arc<WorkerRecord>> {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let name = self.factory.next_name();
        let record = Arc::new(WorkerRecord::new(id, name.clone(), queue_index));
        self.workers.insert(id, Arc::clone(&record));

        let rx = self.queues.receiver(queue_index);
        let stop = self.stop_rx.clone();
        let pool = Arc::downgrade(self);
        let keep_alive = self.config.keep_alive;
        let worker = Arc::clone(&record);

        match self.factory.spawn(name, move || worker.run(pool, rx, stop, keep_alive)) {
            Ok(_) => Ok(record),
            Err(e) => {
                self.workers.remove(&id);
                self.queues.release(queue_index);
                self.live_workers.fetch_sub(1, Ordering::AcqRel);
                Err(PoolError::Spawn(e))
            }
        }
    }

    /// Воркер решает, уходить ли ему после таймаута ожидания.
    /// Пока пул работает, очереди `0..core_size` никогда не теряют воркера;
    /// после `shutdown` уходит любой воркер с опустевшей очередью.
    pub(crate) fn try_retire(&self, queue_index: usize) -> bool {
        if self.state() != PoolState::Running {
            self.live_workers.fetch_sub(1, Ordering::AcqRel);
            return true;
        }
        let core = self.config.core_size;
        if queue_index < core {
            return false;
        }
        self.live_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n > core).then(|| n - 1))
            .is_ok()
    }

    pub(crate) fn remove_worker(&self, record: &WorkerRecord, slot_released: bool) {
        self.queues.release(record.queue_index());
        self.workers.remove(&record.id());
        if !slot_released {
            self.live_workers.fetch_sub(1, Ordering::AcqRel);
        }
        self.release_if_terminated();
    }

    /// Отпускает ссылку пула на себя, когда последний воркер ушёл
    fn release_if_terminated(&self) {
        if !self.is_terminated() {
            return;
        }
        let held = self.draining.lock().ok().and_then(|mut draining| draining.take());
        drop(held);
    }

    #[inline]
    pub(crate) fn record_finished(&self, failed: bool) {
        if failed {
            self.failed_tasks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.completed_tasks.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    fn advance_state(&self, to: PoolState) -> PoolState {
        PoolState::from_u8(self.state.fetch_max(to as u8, Ordering::AcqRel))
    }

    /// Мягкая остановка: новые задачи отклоняются, очереди дорабатываются,
    /// воркеры уходят по таймауту простоя.
    ///
    /// Дроп всех `ThreadPool` сразу после `shutdown` не теряет задачи:
    /// до ухода последнего воркера пул держит себя сам.
    pub fn shutdown(self: &Arc<Self>) {
        if self.advance_state(PoolState::ShuttingDown) != PoolState::Running {
            return;
        }
        tracing::info!("shutdown initiated");

        // у таких очередей нет воркера, иначе задачи в них никто не заберёт
        for (queue, len) in self.queues.lengths().into_iter().enumerate() {
            if len == 0 || self.queues.is_bound(queue) {
                continue;
            }
            match self.spawn_worker(queue) {
                Ok(Some(record)) => tracing::debug!(worker = %record.name(), queue, "spawned drain worker"),
                Ok(None) => {}
                Err(e) => tracing::warn!(queue, error = %e, "failed to spawn drain worker"),
            }
        }

        if let Ok(mut draining) = self.draining.lock() {
            *draining = Some(Arc::clone(self));
        }
        self.release_if_terminated();
    }

    /// Жёсткая остановка: каждый воркер выходит на ближайшей проверке
    /// или сразу после текущей задачи. Запущенная задача не прерывается.
    pub fn shutdown_now(&self) {
        let prev = self.advance_state(PoolState::Stopped);
        for worker in self.workers.iter() {
            worker.stop();
        }
        // будим воркеров, ждущих задачу в select
        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            stop_tx.take();
        }
        if prev != PoolState::Stopped {
            tracing::info!(workers = self.worker_count(), "immediate shutdown initiated");
        }
        self.release_if_terminated();
    }

    /// Забирает задачи, которые так и не начали выполняться.
    /// Имеет смысл после `shutdown_now`.
    pub fn drain_pending(&self) -> Vec<Task> {
        let tasks = self.queues.drain();
        if !tasks.is_empty() {
            tracing::debug!(count = tasks.len(), "drained pending tasks");
        }
        tasks
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.state() != PoolState::Running
    }

    pub fn is_terminated(&self) -> bool {
        self.is_shutdown() && self.worker_count() == 0
    }

    /// Опрос `is_terminated` до дедлайна. Слишком большой `timeout`
    /// означает ожидание без дедлайна.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        while !self.is_terminated() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return false;
            }
            thread::sleep(TERMINATION_POLL);
        }
        true
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.live_workers.load(Ordering::Acquire)
    }

    pub fn idle_count(&self) -> usize {
        self.workers.iter().filter(|w| w.is_idle()).count()
    }

    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        let mut snapshot: Vec<_> = self
            .workers
            .iter()
            .map(|w| WorkerSnapshot {
                name: w.name().to_string(),
                queue_index: w.queue_index(),
                status: w.status(),
            })
            .collect();
        snapshot.sort_by_key(|w| w.queue_index);
        snapshot
    }

    /// Статусы воркеров в порядке их очередей
    pub fn worker_statuses(&self) -> Vec<WorkerStatus> {
        self.workers().into_iter().map(|w| w.status).collect()
    }

    pub fn queue_lengths(&self) -> Vec<usize> {
        self.queues.lengths()
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queues.capacity()
    }

    #[inline]
    pub fn core_size(&self) -> usize {
        self.config.core_size
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Сколько потоков фабрика создала за всё время
    pub fn threads_created(&self) -> usize {
        self.factory.created()
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            state: self.state(),
            live_workers: self.worker_count(),
            idle_workers: self.idle_count(),
            queued_tasks: self.queues.total_len(),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            rejected_tasks: self.rejected_tasks.load(Ordering::Relaxed),
        }
    }

    /// Мониторинг метрик с callback в отдельном потоке
    /// ВАЖНО: Вызовите token.cancel() для остановки мониторинга и освобождения пула
    pub fn start_monitoring<F>(self: &Arc<Self>, interval: Duration, callback: F) -> PoolResult<CancellationToken>
    where
        F: Fn(PoolMetrics) + Send + 'static,
    {
        let pool = Arc::clone(self);
        let token = CancellationToken::new();
        let token_clone = token.clone();
        let name = format!("{}-monitor", self.config.thread_name_prefix);

        thread::Builder::new().name(name).spawn(move || {
            while !token_clone.is_cancelled() {
                thread::sleep(interval);
                if token_clone.is_cancelled() {
                    break;
                }
                callback(pool.metrics());
            }
            drop(pool);
        })?;

        Ok(token)
    }

    pub fn stop_monitoring(token: CancellationToken) {
        token.cancel();
    }
}

impl Drop for ThreadPoolInner {
    /// Задачи, которые никто не успел забрать, отдаются политике отказа
    fn drop(&mut self) {
        let pending = self.queues.drain();
        if pending.is_empty() {
            return;
        }
        tracing::warn!(count = pending.len(), "pool dropped with pending tasks");
        for task in pending {
            self.rejection.rejected(task, None);
        }
    }
}
