use super::handle::Task;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};


/// Фиксированный массив ограниченных FIFO-очередей.
///
/// Каждая очередь помечается как `bound`, пока её обслуживает живой воркер.
/// Забирает задачи из очереди только этот воркер.
pub struct QueueArray {
    senders: Vec<Sender<Task>>,
    receivers: Vec<Receiver<Task>>,
    bound: Vec<AtomicBool>,
    capacity: usize,
}

impl QueueArray {
    pub fn new(len: usize, capacity: usize) -> Self {
        let mut senders = Vec::with_capacity(len);
        let mut receivers = Vec::with_capacity(len);
        let mut bound = Vec::with_capacity(len);

        for _ in 0..len {
            let (tx, rx) = channel::bounded(capacity);
            senders.push(tx);
            receivers.push(rx);
            bound.push(AtomicBool::new(false));
        }

        Self { senders, receivers, bound, capacity }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Неблокирующая вставка. При переполнении задача возвращается обратно.
    #[inline]
    pub fn try_push(&self, index: usize, task: Task) -> Result<(), Task> {
        self.senders[index].try_send(task).map_err(|e| match e {
            TrySendError::Full(t) | TrySendError::Disconnected(t) => t,
        })
    }

    pub fn receiver(&self, index: usize) -> Receiver<Task> {
        self.receivers[index].clone()
    }

    #[inline]
    pub fn claim(&self, index: usize) -> bool {
        self.bound[index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Занимает очередь с наименьшим индексом, у которой нет воркера
    pub fn claim_first_unbound(&self) -> Option<usize> {
        (0..self.len()).find(|&i| self.claim(i))
    }

    #[inline]
    pub fn release(&self, index: usize) {
        self.bound[index].store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_bound(&self, index: usize) -> bool {
        self.bound[index].load(Ordering::Acquire)
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.receivers.iter().map(Receiver::len).collect()
    }

    pub fn total_len(&self) -> usize {
        self.receivers.iter().map(Receiver::len).sum()
    }

    pub fn drain(&self) -> Vec<Task> {
        self.receivers
            .iter()
            .flat_map(|rx| rx.try_iter())
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_push() {
        let queues = QueueArray::new(2, 2);
        assert!(queues.try_push(0, Box::new(|| {})).is_ok());
        assert!(queues.try_push(0, Box::new(|| {})).is_ok());
        assert!(queues.try_push(0, Box::new(|| {})).is_err());
        assert!(queues.try_push(1, Box::new(|| {})).is_ok());
        assert_eq!(queues.lengths(), vec![2, 1]);
        assert_eq!(queues.total_len(), 3);
    }

    #[test]
    fn test_fifo_within_queue() {
        let queues = QueueArray::new(1, 4);
        let (tx, rx) = channel::unbounded();
        for i in 0..3 {
            let tx = tx.clone();
            assert!(queues.try_push(0, Box::new(move || tx.send(i).unwrap())).is_ok());
        }
        let receiver = queues.receiver(0);
        while let Ok(task) = receiver.try_recv() {
            task();
        }
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_claim_reuses_lowest_vacated_index() {
        let queues = QueueArray::new(3, 1);
        assert_eq!(queues.claim_first_unbound(), Some(0));
        assert_eq!(queues.claim_first_unbound(), Some(1));
        assert_eq!(queues.claim_first_unbound(), Some(2));
        assert_eq!(queues.claim_first_unbound(), None);

        queues.release(1);
        assert!(!queues.is_bound(1));
        assert!(!queues.claim(2));
        assert_eq!(queues.claim_first_unbound(), Some(1));
    }

    #[test]
    fn test_drain_empties_every_queue() {
        let queues = QueueArray::new(3, 2);
        for i in 0..3 {
            assert!(queues.try_push(i, Box::new(|| {})).is_ok());
        }
        assert_eq!(queues.drain().len(), 3);
        assert_eq!(queues.total_len(), 0);
    }
}
