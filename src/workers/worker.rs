use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use rust_decimal::Decimal;

use crate::accounts::{Account, Amount};
use crate::error::LedgerError;
use crate::transfers::{TransferCoordinator, TransferReceipt};
use crate::workers::CancellationToken;

#[derive(Debug, Clone)]
pub enum Operation {
    Deposit {
        account: Arc<Account>,
        amount: Amount,
    },
    Withdraw {
        account: Arc<Account>,
        amount: Amount,
    },
    Transfer {
        source: Arc<Account>,
        target: Arc<Account>,
        amount: Amount,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Transfer => "transfer",
        };
        f.write_str(name)
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Deposit { .. } => OperationKind::Deposit,
            Operation::Withdraw { .. } => OperationKind::Withdraw,
            Operation::Transfer { .. } => OperationKind::Transfer,
        }
    }
}

/// One scripted operation and the pause a worker observes before its next one.
#[derive(Debug, Clone)]
pub struct Step {
    pub operation: Operation,
    pub pause: Duration,
}

impl Step {
    pub fn new(operation: Operation, pause: Duration) -> Self {
        Self { operation, pause }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Applied { balance: Decimal },
    Transferred {
        target: String,
        receipt: TransferReceipt,
    },
    InsufficientFunds { available: Decimal },
    Failed { reason: String },
}

/// What a single operation did, for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub worker: String,
    pub kind: OperationKind,
    pub holder: String,
    pub amount: Amount,
    pub status: OutcomeStatus,
}

impl OperationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Applied { .. } | OutcomeStatus::Transferred { .. }
        )
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            OutcomeStatus::Applied { balance } => write!(
                f,
                "{} - {} ${} on {}'s account, balance ${}",
                self.worker, self.kind, self.amount, self.holder, balance
            ),
            OutcomeStatus::Transferred { target, receipt } => write!(
                f,
                "{} - transferred ${} from {} (balance ${}) to {} (balance ${})",
                self.worker,
                self.amount,
                self.holder,
                receipt.source_balance,
                target,
                receipt.target_balance
            ),
            OutcomeStatus::InsufficientFunds { available } => write!(
                f,
                "{} - {} of ${} failed for {} - insufficient funds (available ${})",
                self.worker, self.kind, self.amount, self.holder, available
            ),
            OutcomeStatus::Failed { reason } => write!(
                f,
                "{} - {} of ${} failed for {} - {}",
                self.worker, self.kind, self.amount, self.holder, reason
            ),
        }
    }
}

/// How a worker's script ended.
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub name: String,
    pub outcomes: Vec<OperationOutcome>,
    pub interrupted: bool,
}

/// A named script of account operations run once, start to finish, on its own thread.
#[derive(Debug, Clone)]
pub struct Worker {
    name: String,
    steps: Vec<Step>,
}

impl Worker {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn depositor(
        name: impl Into<String>,
        account: Arc<Account>,
        amounts: impl IntoIterator<Item = Amount>,
        pause: Duration,
    ) -> Self {
        let steps = amounts
            .into_iter()
            .map(|amount| {
                let account = Arc::clone(&account);
                Step::new(Operation::Deposit { account, amount }, pause)
            })
            .collect();
        Self::new(name, steps)
    }

    pub fn withdrawer(
        name: impl Into<String>,
        account: Arc<Account>,
        amounts: impl IntoIterator<Item = Amount>,
        pause: Duration,
    ) -> Self {
        let steps = amounts
            .into_iter()
            .map(|amount| {
                let account = Arc::clone(&account);
                Step::new(Operation::Withdraw { account, amount }, pause)
            })
            .collect();
        Self::new(name, steps)
    }

    pub fn transferer(
        name: impl Into<String>,
        source: Arc<Account>,
        transfers: impl IntoIterator<Item = (Amount, Arc<Account>)>,
        pause: Duration,
    ) -> Self {
        let steps = transfers
            .into_iter()
            .map(|(amount, target)| {
                let source = Arc::clone(&source);
                Step::new(
                    Operation::Transfer {
                        source,
                        target,
                        amount,
                    },
                    pause,
                )
            })
            .collect();
        Self::new(name, steps)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Runs the script once. Failed withdrawals and transfers are reported and
    /// skipped; cancellation stops the script before the next operation and
    /// keeps whatever was already applied.
    pub fn run(&self, coordinator: &TransferCoordinator, token: &CancellationToken) -> WorkerExit {
        info!("{} started", self.name);
        let mut outcomes = Vec::with_capacity(self.steps.len());
        let mut interrupted = false;

        for (index, step) in self.steps.iter().enumerate() {
            if token.is_cancelled() {
                interrupted = true;
                break;
            }

            let outcome = self.apply(&step.operation, coordinator);
            if outcome.succeeded() {
                info!("{}", outcome);
            } else {
                warn!("{}", outcome);
            }
            outcomes.push(outcome);

            let last = index + 1 == self.steps.len();
            if !last && !token.pause(step.pause) {
                interrupted = true;
                break;
            }
        }

        if interrupted {
            let err = LedgerError::Interrupted {
                worker: self.name.clone(),
            };
            warn!("{} after {} of {} operations", err, outcomes.len(), self.steps.len());
        } else {
            info!("{} completed", self.name);
        }

        WorkerExit {
            name: self.name.clone(),
            outcomes,
            interrupted,
        }
    }

    fn apply(&self, operation: &Operation, coordinator: &TransferCoordinator) -> OperationOutcome {
        let kind = operation.kind();
        let (holder, amount, result) = match operation {
            Operation::Deposit { account, amount } => (
                account.holder(),
                *amount,
                Ok(OutcomeStatus::Applied {
                    balance: account.deposit(*amount),
                }),
            ),
            Operation::Withdraw { account, amount } => (
                account.holder(),
                *amount,
                account
                    .withdraw(*amount)
                    .map(|balance| OutcomeStatus::Applied { balance }),
            ),
            Operation::Transfer {
                source,
                target,
                amount,
            } => (
                source.holder(),
                *amount,
                coordinator
                    .transfer(source, target, *amount)
                    .map(|receipt| OutcomeStatus::Transferred {
                        target: target.holder().to_string(),
                        receipt,
                    }),
            ),
        };

        let status = match result {
            Ok(status) => status,
            Err(LedgerError::InsufficientFunds { available, .. }) => {
                OutcomeStatus::InsufficientFunds { available }
            }
            Err(err) => OutcomeStatus::Failed {
                reason: err.to_string(),
            },
        };

        OperationOutcome {
            worker: self.name.clone(),
            kind,
            holder: holder.to_string(),
            amount,
            status,
        }
    }
}
