use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cooperative shutdown signal shared by the coordinator, the workers, and
/// the signal-handler task. Raise-once, then read-only.
#[derive(Debug, Default)]
pub struct StopSignal {
    raised: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Resolves once the signal has been raised.
    pub async fn raised(&self) {
        while !self.is_raised() {
            self.notify.notified().await;
        }
    }
}

/// Two-stage shutdown: the first SIGINT/SIGTERM raises the stop signal so
/// the run winds down gracefully; the second force-exits with code 1. The
/// task goes away on its own when the stop signal is raised elsewhere.
pub fn install_signal_handler(stop: Arc<StopSignal>) {
    tokio::spawn(async move {
        wait_for_shutdown_signals(stop).await;
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signals(stop: Arc<StopSignal>) {
    use tokio::signal::unix::{SignalKind, signal};

    let Ok(mut interrupt) = signal(SignalKind::interrupt()) else {
        return;
    };
    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        return;
    };

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = stop.raised() => return,
    }
    stop.raise();

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
    std::process::exit(1);
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signals(stop: Arc<StopSignal>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = stop.raised() => return,
    }
    stop.raise();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn raise_is_idempotent_and_observable() {
        let stop = Arc::new(StopSignal::new());
        assert!(!stop.is_raised());

        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move { stop.raised().await })
        };

        stop.raise();
        stop.raise();
        assert!(stop.is_raised());

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should observe the raised signal")
            .expect("waiter task should not panic");
    }
}
