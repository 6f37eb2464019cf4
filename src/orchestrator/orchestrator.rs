use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info};

use crate::accounts::Account;
use crate::error::{LedgerError, LedgerResult};
use crate::orchestrator::Report;
use crate::transfers::TransferCoordinator;
use crate::workers::{CancellationToken, Worker, WorkerExit};

/// Launches every worker on its own thread and waits for all of them before
/// reading balances.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    coordinator: TransferCoordinator,
    deadline: Option<Duration>,
}

impl Runner {
    pub fn new(coordinator: TransferCoordinator) -> Self {
        Self {
            coordinator,
            deadline: None,
        }
    }

    /// Cancels the run's token once `deadline` has passed since launch.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn run(
        &self,
        accounts: &[Arc<Account>],
        workers: Vec<Worker>,
        token: &CancellationToken,
    ) -> LedgerResult<Report> {
        info!(
            "launching {} workers over {} accounts ({:?} transfers)",
            workers.len(),
            accounts.len(),
            self.coordinator.policy()
        );

        // Dismissed on drop, including the early return when a spawn fails.
        let watchdog = self
            .deadline
            .map(|deadline| Watchdog::spawn(deadline, token.clone()));

        let mut handles = Vec::with_capacity(workers.len());
        for worker in workers {
            let name = worker.name().to_string();
            let coordinator = self.coordinator;
            let worker_token = token.clone();
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker.run(&coordinator, &worker_token));
            match spawned {
                Ok(handle) => handles.push((name, handle)),
                Err(source) => {
                    // Stop the workers already running before reporting the failure.
                    token.cancel();
                    for (_, handle) in handles {
                        handle.join().ok();
                    }
                    return Err(LedgerError::Spawn {
                        worker: name,
                        source,
                    });
                }
            }
        }

        let mut exits = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.join() {
                Ok(exit) => exits.push(exit),
                Err(_) => {
                    error!("{} panicked; its completed operations remain applied", name);
                    exits.push(WorkerExit {
                        name,
                        outcomes: vec![],
                        interrupted: true,
                    });
                }
            }
        }
        drop(watchdog);

        let report = Report::snapshot(accounts, exits);
        info!("all workers finished, total balance ${}", report.total());
        Ok(report)
    }
}

/// Cancels a run's token when its deadline passes. It sleeps on its own token,
/// so dropping it stops the thread without touching the run.
struct Watchdog {
    stop: CancellationToken,
    handle: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    fn spawn(deadline: Duration, run_token: CancellationToken) -> Self {
        let stop = CancellationToken::new();
        let watch = stop.clone();
        let handle = thread::spawn(move || {
            if watch.pause(deadline) {
                info!("deadline of {:?} reached, cancelling workers", deadline);
                run_token.cancel();
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}
