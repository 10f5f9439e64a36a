//! Background tasks bound to the viewer's lifetime.

use tokio::task::JoinHandle;

/// Owns spawned tasks and aborts whatever is still running when dropped.
#[derive(Debug, Default)]
pub struct TaskSet {
    handles: Vec<JoinHandle<()>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    /// Number of tasks not yet finished.
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn dropping_the_set_cancels_its_tasks() {
        let (tx, rx) = oneshot::channel::<()>();
        let mut tasks = TaskSet::new();
        tasks.push(tokio::spawn(async move {
            let _keep = tx;
            std::future::pending::<()>().await;
        }));
        assert_eq!(tasks.running(), 1);

        drop(tasks);
        assert!(rx.await.is_err(), "task should have been aborted");
    }

    #[tokio::test]
    async fn finished_tasks_are_pruned() {
        let mut tasks = TaskSet::new();
        let done = tokio::spawn(async {});
        while !done.is_finished() {
            tokio::task::yield_now().await;
        }
        tasks.push(done);
        tasks.push(tokio::spawn(std::future::pending::<()>()));
        assert_eq!(tasks.running(), 1);
        assert_eq!(tasks.handles.len(), 1);
    }
}
