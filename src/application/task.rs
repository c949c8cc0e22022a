//! # Task
//!
//! A periodic background job scoped to one module, with offset, interval, and
//! repetition-bound semantics. Handler failures are swallowed at the trigger
//! boundary so a broken task never stops the schedule on its own.

use anyhow::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

pub type TaskHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Wrap an async closure into a [`TaskHandler`].
pub fn task_handler<F, Fut>(f: F) -> TaskHandler
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOptions {
    /// Interval between repeated triggers. Zero means no repetition.
    pub run_every: Duration,
    /// Bound on total triggers. Zero means unbounded.
    pub run_for: u64,
    /// Delay before the first trigger.
    pub offset: Duration,
}

/// Declared definition of a task, consumed once at module construction.
pub struct TaskSpec {
    pub name: String,
    pub handler: TaskHandler,
    pub options: TaskOptions,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, handler: TaskHandler, options: TaskOptions) -> Self {
        Self {
            name: name.into(),
            handler,
            options,
        }
    }
}

pub struct Task {
    name: String,
    module: String,
    handler: TaskHandler,
    options: TaskOptions,
    loop_count: AtomicU64,
    // Cancellation signal for the armed repeating timer, if any. The signal
    // is only observed between ticks, never inside a running trigger.
    timer: Mutex<Option<Arc<Notify>>>,
}

impl Task {
    pub fn from_spec(module: &str, spec: TaskSpec) -> Arc<Self> {
        Arc::new(Self {
            name: spec.name,
            module: module.to_string(),
            handler: spec.handler,
            options: spec.options,
            loop_count: AtomicU64::new(0),
            timer: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Completed triggers so far. Survives `stop()`; re-arming via `start()`
    /// does not reset it.
    pub fn loop_count(&self) -> u64 {
        self.loop_count.load(Ordering::SeqCst)
    }

    /// Run the handler once, with failures caught and reported against the
    /// owning module. The counter advances on success and handled failure
    /// alike.
    pub async fn trigger(&self) {
        if let Err(e) = (self.handler)().await {
            tracing::error!(module = %self.module, task = %self.name, "Task handler failed: {e:#}");
        }
        self.loop_count.fetch_add(1, Ordering::SeqCst);
    }

    fn bound_reached(&self) -> bool {
        self.options.run_for > 0 && self.loop_count() >= self.options.run_for
    }

    /// Arm the task: wait out the offset, run the first trigger to
    /// completion, then start the repeating timer if one is configured.
    /// Calling `start()` again re-arms, cancelling any previous timer.
    pub async fn start(self: &Arc<Self>) {
        self.stop().await;
        if self.options.offset > Duration::ZERO {
            tokio::time::sleep(self.options.offset).await;
        }
        self.trigger().await;
        if self.options.run_every == Duration::ZERO || self.bound_reached() {
            return;
        }
        let cancel = Arc::new(Notify::new());
        *self.timer.lock().await = Some(cancel.clone());
        let task = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.notified() => break,
                    _ = tokio::time::sleep(task.options.run_every) => {}
                }
                task.trigger().await;
                if task.bound_reached() {
                    // Auto-stop: detach our own timer entry so a later
                    // stop() correctly reports nothing to cancel.
                    task.timer.lock().await.take();
                    break;
                }
            }
        });
    }

    /// Cancel the repeating timer if one is armed. Returns whether a timer
    /// was actually cancelled. An in-flight trigger runs to completion and
    /// still advances the counter; the cancellation lands at the next tick
    /// boundary.
    pub async fn stop(&self) -> bool {
        match self.timer.lock().await.take() {
            Some(cancel) => {
                cancel.notify_one();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn counting_task(options: TaskOptions) -> Arc<Task> {
        Task::from_spec(
            "mod",
            TaskSpec::new("tick", task_handler(|| async { Ok(()) }), options),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_repetition_stops_at_run_for() {
        let task = counting_task(TaskOptions {
            run_every: Duration::from_millis(1000),
            run_for: 3,
            offset: Duration::from_millis(1000),
        });

        let before = Instant::now();
        task.start().await;
        // First trigger happens only after the offset.
        assert!(before.elapsed() >= Duration::from_millis(1000));
        assert_eq!(task.loop_count(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(task.loop_count(), 3);

        // The schedule ceased on its own even though stop() was never called.
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(task.loop_count(), 3);
        assert!(!task.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_interval_triggers_once() {
        let task = counting_task(TaskOptions::default());
        task.start().await;
        assert_eq!(task.loop_count(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(task.loop_count(), 1);
        assert!(!task.stop().await, "nothing to cancel with run_every 0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_trigger_finish() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let task = Task::from_spec(
            "mod",
            TaskSpec::new(
                "slow",
                task_handler(move || {
                    let tx = tx.clone();
                    async move {
                        let _ = tx.send("begin");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        let _ = tx.send("end");
                        Ok(())
                    }
                }),
                TaskOptions {
                    run_every: Duration::from_millis(100),
                    ..Default::default()
                },
            ),
        );
        task.start().await;
        assert_eq!(rx.recv().await, Some("begin"));
        assert_eq!(rx.recv().await, Some("end"));

        // Stop while the second trigger's handler is still running.
        assert_eq!(rx.recv().await, Some("begin"));
        assert!(task.stop().await);
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("in-flight trigger did not finish"),
            Some("end")
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(task.loop_count(), 2);
        assert!(rx.try_recv().is_err(), "interval fired again after stop()");
        assert!(!task.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_reports_cancellation_once() {
        let task = counting_task(TaskOptions {
            run_every: Duration::from_millis(100),
            ..Default::default()
        });
        task.start().await;
        assert!(task.stop().await);
        assert!(!task.stop().await, "second stop has nothing to cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_rearms_without_resetting_counter() {
        let task = counting_task(TaskOptions {
            run_every: Duration::from_millis(100),
            ..Default::default()
        });
        task.start().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        task.stop().await;
        let after_first_run = task.loop_count();
        assert!(after_first_run >= 3);

        task.start().await;
        assert_eq!(task.loop_count(), after_first_run + 1);
        assert!(task.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_failure_does_not_stop_schedule() {
        let task = Task::from_spec(
            "mod",
            TaskSpec::new(
                "broken",
                task_handler(|| async { Err(anyhow::anyhow!("boom")) }),
                TaskOptions {
                    run_every: Duration::from_millis(100),
                    ..Default::default()
                },
            ),
        );
        task.start().await;
        assert_eq!(task.loop_count(), 1);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(task.loop_count() >= 3, "failures must not break the interval");
        task.stop().await;
    }
}
