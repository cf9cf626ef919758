/// Жизненный цикл пула. Порядок вариантов значим: переходы только вперёд.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PoolState {
    Running = 0,
    ShuttingDown = 1,
    Stopped = 2,
}

impl PoolState {
    #[inline]
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => PoolState::Running,
            1 => PoolState::ShuttingDown,
            _ => PoolState::Stopped,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerStatus {
    Idle = 0,
    Busy = 1,
    Terminated = 2,
}

impl WorkerStatus {
    #[inline]
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerStatus::Idle,
            1 => WorkerStatus::Busy,
            _ => WorkerStatus::Terminated,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub name: String,
    pub queue_index: usize,
    pub status: WorkerStatus,
}


/// Куда попала задача при `execute`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Queued { queue: usize },
    /// Очередь была полна, задача отдана политике отказа
    Rejected { queue: usize },
}

impl Admission {
    #[inline]
    pub fn queue(&self) -> usize {
        match *self {
            Admission::Queued { queue } | Admission::Rejected { queue } => queue,
        }
    }

    #[inline]
    pub fn is_queued(&self) -> bool {
        matches!(self, Admission::Queued { .. })
    }
}


#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub state: PoolState,
    pub live_workers: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub rejected_tasks: usize,
}

impl PoolMetrics {
    pub fn busy_workers(&self) -> usize {
        self.live_workers.saturating_sub(self.idle_workers)
    }

    pub fn utilization(&self) -> f64 {
        if self.live_workers == 0 {
            return 0.0;
        }
        self.busy_workers() as f64 / self.live_workers as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(live: usize, idle: usize, completed: usize, failed: usize) -> PoolMetrics {
        PoolMetrics {
            state: PoolState::Running,
            live_workers: live,
            idle_workers: idle,
            queued_tasks: 0,
            completed_tasks: completed,
            failed_tasks: failed,
            rejected_tasks: 0,
        }
    }

    #[test]
    fn test_state_order() {
        assert!(PoolState::Running < PoolState::ShuttingDown);
        assert!(PoolState::ShuttingDown < PoolState::Stopped);
        assert_eq!(PoolState::from_u8(PoolState::ShuttingDown as u8), PoolState::ShuttingDown);
    }

    #[test]
    fn test_utilization() {
        assert_eq!(metrics(0, 0, 0, 0).utilization(), 0.0);
        assert_eq!(metrics(4, 1, 0, 0).utilization(), 0.75);
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(metrics(1, 1, 0, 0).success_rate(), 1.0);
        assert_eq!(metrics(1, 1, 3, 1).success_rate(), 0.75);
    }
}
