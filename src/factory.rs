use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};


/// Создаёт потоки воркеров с уникальными именами `<prefix>-<n>`, n с 1
#[derive(Debug)]
pub struct ThreadFactory {
    prefix: String,
    counter: AtomicUsize,
}

impl ThreadFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicUsize::new(1),
        }
    }

    #[inline]
    pub fn next_name(&self) -> String {
        format!("{}-{}", self.prefix, self.counter.fetch_add(1, Ordering::Relaxed))
    }

    pub fn spawn<F>(&self, name: String, f: F) -> io::Result<thread::JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        tracing::debug!(thread = %name, "creating new thread");
        thread::Builder::new().name(name).spawn(f)
    }

    /// Сколько имён уже выдано
    pub fn created(&self) -> usize {
        self.counter.load(Ordering::Relaxed) - 1
    }
}
