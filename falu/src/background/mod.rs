pub mod forwarder;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Tracks fire-and-forget tasks by id so they can be drained or aborted on
/// shutdown. Finished tasks are pruned whenever a new one is spawned.
pub struct BackgroundTaskManager {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl BackgroundTaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a task under `task_id`.
    /// A still-running task with the same id is aborted first.
    pub fn spawn_task<F>(&mut self, task_id: String, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|_, handle| !handle.is_finished());

        if let Some(handle) = self.tasks.remove(&task_id) {
            tracing::debug!("Replacing in-flight task {}", task_id);
            handle.abort();
        }

        let handle = tokio::spawn(future);
        self.tasks.insert(task_id, handle);
    }

    /// Number of tasks that have not finished yet
    pub fn active_count(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    /// Wait up to `grace` for running tasks, then abort whatever is left
    pub async fn wait_all(&mut self, grace: Duration) {
        let handles: Vec<JoinHandle<()>> = self.tasks.drain().map(|(_, h)| h).collect();
        if handles.is_empty() {
            return;
        }

        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let pending = handles.len();
        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            tracing::warn!(
                "Aborting background tasks still running after {:?} ({} tracked)",
                grace,
                pending
            );
            for abort in aborts {
                abort.abort();
            }
        }
    }

    /// Cancel all running tasks
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

impl Default for BackgroundTaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BackgroundTaskManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_all_drains_finished_tasks() {
        let mut manager = BackgroundTaskManager::new();
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let done = done.clone();
            manager.spawn_task(format!("task-{i}"), async move {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        manager.wait_all(Duration::from_secs(1)).await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_all_aborts_after_grace() {
        let mut manager = BackgroundTaskManager::new();
        let done = Arc::new(AtomicUsize::new(0));

        let counter = done.clone();
        manager.spawn_task("slow".to_string(), async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.wait_all(Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_id_replaces_running_task() {
        let mut manager = BackgroundTaskManager::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = done.clone();
            manager.spawn_task("evt_1".to_string(), async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(manager.active_count(), 1);

        manager.wait_all(Duration::from_secs(5)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
