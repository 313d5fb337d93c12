//! Periodic preview capture for sessions that are not open.

use crate::host::PreviewService;
use crate::session::ConnectionParams;
use crate::viewport::Size;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Latest preview result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PreviewState {
    /// No capture has completed yet
    #[default]
    Pending,
    /// Target answered; remote display size at capture time
    Online(Size),
    /// Capture failed
    Offline(String),
}

/// Polls one target on a fixed interval and publishes the result.
///
/// Each poller is independent; dropping it stops the polling task.
pub struct PreviewPoller {
    state: watch::Receiver<PreviewState>,
    task: Option<JoinHandle<()>>,
}

impl PreviewPoller {
    /// Start polling immediately, then every `interval`
    pub fn start(
        runtime: &Handle,
        service: Arc<dyn PreviewService>,
        params: ConnectionParams,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(PreviewState::Pending);
        let interval = interval.max(Duration::from_secs(1));

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let next = match service.capture(&params).await {
                    Ok(size) => PreviewState::Online(size),
                    Err(e) => {
                        log::debug!("Preview of {} failed: {}", params.host, e);
                        PreviewState::Offline(e.to_string())
                    }
                };
                if tx.send(next).is_err() {
                    // Every receiver is gone
                    break;
                }
            }
        });

        Self {
            state: rx,
            task: Some(task),
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state.borrow().clone()
    }

    /// Receiver for UI updates
    pub fn subscribe(&self) -> watch::Receiver<PreviewState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PreviewPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
