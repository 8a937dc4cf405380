// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use tokio::signal::unix::{Signal, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// A helper to manage graceful shutdowns and track the tasks that should
/// finish before the process exits.
///
/// The first SIGTERM or SIGINT triggers a soft shutdown: the soft shutdown
/// token is cancelled and the manager waits for the tracked tasks. A second
/// signal, or the timeout, makes [`ShutdownManager::run`] return without
/// waiting any further.
///
/// Long-running tasks should watch the `soft_shutdown_token` to stop taking
/// new work, and be spawned on the `task_tracker` so that the manager knows
/// when they are done.
pub struct ShutdownManager {
    soft_shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
    sigterm: Signal,
    sigint: Signal,
    timeout: Duration,
}

impl ShutdownManager {
    /// Create a new shutdown manager, installing the signal handlers
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler could not be installed
    pub fn new() -> Result<Self, std::io::Error> {
        let soft_shutdown_token = CancellationToken::new();
        let sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
        let sigint = tokio::signal::unix::signal(SignalKind::interrupt())?;
        let timeout = Duration::from_secs(60);
        let task_tracker = TaskTracker::new();

        Ok(Self {
            soft_shutdown_token,
            task_tracker,
            sigterm,
            sigint,
            timeout,
        })
    }

    /// Get a reference to the task tracker
    #[must_use]
    pub fn task_tracker(&self) -> &TaskTracker {
        &self.task_tracker
    }

    /// Get a cancellation token that can be used to react to a soft shutdown
    #[must_use]
    pub fn soft_shutdown_token(&self) -> CancellationToken {
        self.soft_shutdown_token.clone()
    }

    /// Run until every tracked task finished, or until shutdown is forced.
    ///
    /// If all the tracked tasks exit on their own before any signal arrives,
    /// this returns as well.
    pub async fn run(mut self) {
        self.task_tracker.close();

        // Wait for a first signal and trigger the soft shutdown
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::info!("Shutdown signal received (SIGTERM), shutting down");
            },
            _ = self.sigint.recv() => {
                tracing::info!("Shutdown signal received (SIGINT), shutting down");
            },
            () = self.task_tracker.wait() => {
                tracing::info!("All tasks exited on their own");
                return;
            },
        };

        self.soft_shutdown_token.cancel();

        let timeout = tokio::time::sleep(self.timeout);
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::warn!("Second shutdown signal received (SIGTERM), abort");
            },
            _ = self.sigint.recv() => {
                tracing::warn!("Second shutdown signal received (SIGINT), abort");
            },
            () = timeout => {
                tracing::warn!("Shutdown timeout reached, abort");
            },
            () = self.task_tracker.wait() => {
                tracing::info!("All tasks are done, exiting");
            },
        }

        // Tasks still running are dropped along with the runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_once_tasks_are_done() {
        let shutdown = ShutdownManager::new().unwrap();
        let soft_shutdown_token = shutdown.soft_shutdown_token();

        let (tx, rx) = tokio::sync::oneshot::channel();
        shutdown.task_tracker().spawn(async move {
            rx.await.unwrap();
        });
        let task_tracker = shutdown.task_tracker().clone();

        let run = tokio::spawn(shutdown.run());
        tokio::task::yield_now().await;
        assert!(!run.is_finished());

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();

        assert!(task_tracker.is_empty());
        assert!(!soft_shutdown_token.is_cancelled());
    }
}
