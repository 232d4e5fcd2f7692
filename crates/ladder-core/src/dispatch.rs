//! In-process play dispatcher backed by a tokio channel.
//!
//! `run_after` spawns a timer task per submission and returns at once; the
//! task is delivered to the paired [`PlayReceiver`] when the timer fires.
//! Nothing is persisted, so pending tasks are lost with the process.

use std::time::Duration;

use async_trait::async_trait;
use ladder_state::{PlayScheduler, PlayTask, ScheduledTask, StorageError, StorageResult, TaskId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// [`PlayScheduler`] that delivers tasks over an unbounded channel.
#[derive(Debug, Clone)]
pub struct TokioPlayScheduler {
    tx: mpsc::UnboundedSender<ScheduledTask>,
}

impl TokioPlayScheduler {
    /// Create a scheduler and the receiver its tasks are delivered to.
    pub fn channel() -> (Self, PlayReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, PlayReceiver { rx })
    }
}

#[async_trait]
impl PlayScheduler for TokioPlayScheduler {
    async fn run_after(&self, delay: Duration, task: PlayTask) -> StorageResult<TaskId> {
        if self.tx.is_closed() {
            return Err(StorageError::Backend(
                "play receiver has been dropped".to_string(),
            ));
        }

        let scheduled = ScheduledTask::pending(task, delay);
        let task_id = scheduled.task_id.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let task_id = scheduled.task_id.clone();
            if tx.send(scheduled).is_err() {
                warn!(task_id = %task_id, "play receiver dropped before delivery");
            }
        });

        debug!(task_id = %task_id, delay_ms = delay.as_millis() as u64, "play task submitted");
        Ok(task_id)
    }
}

/// Receiving side of a [`TokioPlayScheduler`].
#[derive(Debug)]
pub struct PlayReceiver {
    rx: mpsc::UnboundedReceiver<ScheduledTask>,
}

impl PlayReceiver {
    /// Wait for the next delivered task. `None` once every scheduler handle
    /// is dropped and no timers are pending.
    pub async fn recv(&mut self) -> Option<ScheduledTask> {
        self.rx.recv().await
    }

    /// A task that has already been delivered, if any.
    pub fn try_recv(&mut self) -> Option<ScheduledTask> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_state::GameId;

    fn task(level: u32) -> PlayTask {
        PlayTask {
            game_id: GameId("g-1".to_string()),
            model_id: "m".to_string(),
            level,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_after_delay() {
        let (scheduler, mut rx) = TokioPlayScheduler::channel();
        let id = scheduler
            .run_after(Duration::from_secs(5), task(2))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_none());

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.task_id, id);
        assert_eq!(delivered.payload.level, 2);
    }

    #[tokio::test]
    async fn zero_delay_delivers_in_submission_order() {
        let (scheduler, mut rx) = TokioPlayScheduler::channel();
        scheduler.run_after(Duration::ZERO, task(1)).await.unwrap();
        let first = rx.recv().await.unwrap();
        scheduler.run_after(Duration::ZERO, task(2)).await.unwrap();
        let second = rx.recv().await.unwrap();

        assert_eq!(first.payload.level, 1);
        assert_eq!(second.payload.level, 2);
    }

    #[tokio::test]
    async fn dropped_receiver_is_backend_error() {
        let (scheduler, rx) = TokioPlayScheduler::channel();
        drop(rx);
        let err = scheduler.run_after(Duration::ZERO, task(1)).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
