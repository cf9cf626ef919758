use super::errors::{TaskError, TaskResult};
use std::{
    any::Any,
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    sync::oneshot::{self, error::TryRecvError},
    time::Duration,
};
use tokio_util::sync::CancellationToken;


/// Единица работы пула: непрозрачное замыкание без результата
pub type Task = Box<dyn FnOnce() + Send + 'static>;


/// Handle на задачу из `submit` с поддержкой отмены и timeout
///
/// Резолвится результатом задачи, либо ошибкой: паника внутри задачи,
/// отмена до старта, выброс задачи без выполнения.
pub struct JoinHandle<T> {
    cancel_token: CancellationToken,
    receiver: oneshot::Receiver<TaskResult<T>>,
}

impl<T> JoinHandle<T> {

    pub fn new
    (
        cancel_token: CancellationToken,
        receiver: oneshot::Receiver<TaskResult<T>>,
    ) -> Self {
        Self {
            cancel_token,
            receiver
        }
    }

    /// Отменяет задачу, если воркер ещё не начал её выполнять.
    /// Уже запущенная задача доработает до конца.
    #[inline]
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Блокирующее ожидание результата.
    ///
    /// # Panics
    /// Паникует при вызове изнутри async-контекста tokio, там нужен `.await`.
    pub fn join(self) -> TaskResult<T> {
        self.receiver.blocking_recv().unwrap_or(Err(TaskError::Discarded))
    }

    /// Неблокирующая проверка: `None`, пока задача не завершилась
    pub fn try_result(&mut self) -> Option<TaskResult<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TaskError::Discarded)),
        }
    }

    pub async fn await_timeout(self, timeout: Duration) -> TaskResult<T> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TaskError::Discarded),
            Err(_) => Err(TaskError::Timeout(timeout)),
        }
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = TaskResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.unwrap_or(Err(TaskError::Discarded))),
            Poll::Pending => Poll::Pending,
        }
    }
}


/// Ожидает все handles, порядок результатов совпадает с порядком handles
pub async fn join_all<T>(handles: Vec<JoinHandle<T>>) -> Vec<TaskResult<T>> {
    if handles.is_empty() {
        return Vec::new();
    }
    futures::future::join_all(handles).await
}


/// Оборачивает замыкание в `Task`, результат уходит в `JoinHandle`.
/// Если `Task` дропнут без запуска, sender закрывается и handle
/// получает `TaskError::Discarded`.
pub(crate) fn task_with_handle<T, F>(f: F) -> (Task, JoinHandle<T>)
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel::<TaskResult<T>>();
    let cancel_token = CancellationToken::new();
    let ct = cancel_token.clone();

    let task: Task = Box::new(move || {
        if ct.is_cancelled() {
            let _ = tx.send(Err(TaskError::Cancelled));
            return;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(f))
            .map_err(|payload| TaskError::Panic(panic_message(payload.as_ref())));
        let _ = tx.send(result);
    });

    (task, JoinHandle::new(cancel_token, rx))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
