use std::{num::NonZeroU32, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};

use crate::error::{SumireError, SumireResult};

/// A unit of work the pool can schedule. A failing task is re-run as a
/// whole, so `run` must be safe to call again on the same task.
pub(crate) trait PoolTask: Send + Sync + 'static {
    fn name(&self) -> String;

    fn run(self: Arc<Self>) -> impl std::future::Future<Output = SumireResult<()>> + Send;
}

/// Terminal state of one task after the pool has drained.
pub(crate) struct TaskReport {
    pub name: String,
    pub attempts: u32,
    pub error: Option<SumireError>,
}

impl TaskReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Run all tasks with at most `concurrency` in flight, giving each up to
/// `max_attempts` attempts before recording it as failed.
///
/// The pool always drains fully; a failing task never stops the others.
/// The phase verdict is whatever the caller reduces the reports to.
pub(crate) async fn run<T>(
    tasks: Vec<Arc<T>>,
    concurrency: NonZeroU32,
    max_attempts: NonZeroU32,
) -> Vec<TaskReport>
where
    T: PoolTask,
{
    let permits = Arc::new(Semaphore::new(concurrency.get() as usize));
    let mut workers = JoinSet::new();

    for task in tasks {
        let permits = permits.clone();
        workers.spawn(async move {
            // The semaphore is fair, so tasks start in submission order.
            let _permit = permits.acquire_owned().await.unwrap();

            let name = task.name();
            let mut attempts = 0;
            loop {
                attempts += 1;
                match task.clone().run().await {
                    Ok(()) => {
                        log::debug!("{name}: finished after {attempts} attempt(s)");
                        return TaskReport {
                            name,
                            attempts,
                            error: None,
                        };
                    }
                    Err(error) => {
                        if attempts >= max_attempts.get() {
                            log::error!("{name}: failed, max attempts exceeded, drop. {error}");
                            return TaskReport {
                                name,
                                attempts,
                                error: Some(error),
                            };
                        }
                        log::warn!("{name}: attempt {attempts} failed, retry later. {error}");
                    }
                }
            }
        });
    }

    let mut reports = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(error) => log::error!("Worker task panicked: {error}"),
        }
    }
    reports
}
