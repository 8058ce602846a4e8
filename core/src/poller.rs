// Fixed-interval polling tasks
//
// Each poller runs its task immediately and then on every tick. Dropping or
// stopping the handle aborts the task, which is how panels tear down their
// timers when their inputs change.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub struct Poller;

impl Poller {
    pub fn spawn<F, Fut>(name: impl Into<String>, interval: Duration, task: F) -> PollHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        info!(target: "poller", name = %name, interval_ms = interval.as_millis() as u64, "Starting poller");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // A slow fetch must not be followed by a burst of catch-up ticks
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!(target: "poller", name = %task_name, "Tick");
                task().await;
            }
        });

        PollHandle {
            name,
            handle: Some(handle),
        }
    }
}

pub struct PollHandle {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!(target: "poller", name = %self.name, "Stopped poller");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
