use multiqueue_pool::{logging, rejection, ThreadPoolInner};
use std::{thread, time::Duration};


fn main() {
    logging::init_default();

    let pool = match ThreadPoolInner::new(
        2,
        4,
        5,
        Duration::from_secs(5),
        1,
        rejection::from_fn(|_task, _pool| {
            tracing::warn!("[CustomHandler] rejected task");
        }),
    ) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("failed to start pool: {}", e);
            std::process::exit(1);
        }
    };

    // имитационные задачи
    for task_id in 0..12 {
        let result = pool.execute(move || {
            tracing::info!(task_id, ">> task started");
            thread::sleep(Duration::from_secs(2));
            tracing::info!(task_id, "<< task completed");
        });
        match result {
            Ok(admission) => tracing::info!(task_id, ?admission, "submitted"),
            Err(e) => tracing::error!(task_id, error = %e, "submit failed"),
        }
    }

    thread::sleep(Duration::from_secs(15));
    pool.shutdown();
    let terminated = pool.await_termination(Duration::from_secs(10));

    tracing::info!(terminated, metrics = ?pool.metrics(), "program finished");
}
