//! Moving money between two accounts.
//!
//! A transfer is withdraw-then-deposit. It is either applied in full or not at
//! all, so the sum over all accounts never changes because of a transfer.
//!
//! Two locking policies are available:
//!
//! - [`TransferPolicy::Sequential`] takes the source lock for the withdrawal,
//!   releases it, then takes the target lock for the deposit. At most one
//!   account lock is held at any time, so opposite-direction transfers cannot
//!   deadlock. Between the two steps an observer can see the amount missing
//!   from the source and not yet at the target.
//! - [`TransferPolicy::Ordered`] locks both accounts in a fixed total order and
//!   moves the money in one critical section, hiding the in-flight amount.

use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;
use rust_decimal::Decimal;

use crate::accounts::account::{credit, debit};
use crate::accounts::{Account, Amount};
use crate::error::LedgerResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferPolicy {
    #[default]
    Sequential,
    Ordered,
}

/// Balances observed right after a transfer's own writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub source_balance: Decimal,
    pub target_balance: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferCoordinator {
    policy: TransferPolicy,
}

impl TransferCoordinator {
    pub fn new(policy: TransferPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    /// Moves `amount` from `source` to `target`, failing with
    /// `InsufficientFunds` and no side effect when the source cannot cover it.
    pub fn transfer(
        &self,
        source: &Arc<Account>,
        target: &Arc<Account>,
        amount: Amount,
    ) -> LedgerResult<TransferReceipt> {
        if Arc::ptr_eq(source, target) {
            return self_transfer(source, amount);
        }
        match self.policy {
            TransferPolicy::Sequential => sequential(source, target, amount),
            TransferPolicy::Ordered => ordered(source, target, amount),
        }
    }
}

fn self_transfer(account: &Account, amount: Amount) -> LedgerResult<TransferReceipt> {
    let mut balance = account.lock();
    debit(account.holder(), &mut balance, amount)?;
    let balance = credit(&mut balance, amount);
    Ok(TransferReceipt {
        source_balance: balance,
        target_balance: balance,
    })
}

fn sequential(source: &Account, target: &Account, amount: Amount) -> LedgerResult<TransferReceipt> {
    // Each call takes and releases its own lock; the source guard is gone
    // before the target lock is requested.
    let source_balance = source.withdraw(amount)?;
    let target_balance = target.deposit(amount);
    debug!(
        "moved {} from {} to {} one lock at a time",
        amount,
        source.holder(),
        target.holder()
    );
    Ok(TransferReceipt {
        source_balance,
        target_balance,
    })
}

fn ordered(
    source: &Arc<Account>,
    target: &Arc<Account>,
    amount: Amount,
) -> LedgerResult<TransferReceipt> {
    let source_first = lock_order(source, target) == Ordering::Less;
    let (mut source_guard, mut target_guard) = if source_first {
        let s = source.lock();
        let t = target.lock();
        (s, t)
    } else {
        let t = target.lock();
        let s = source.lock();
        (s, t)
    };

    let source_balance = debit(source.holder(), &mut source_guard, amount)?;
    let target_balance = credit(&mut target_guard, amount);
    debug!(
        "moved {} from {} to {} under both locks",
        amount,
        source.holder(),
        target.holder()
    );
    Ok(TransferReceipt {
        source_balance,
        target_balance,
    })
}

/// Total order over distinct accounts: holder name, then address for namesakes.
fn lock_order(a: &Arc<Account>, b: &Arc<Account>) -> Ordering {
    a.holder()
        .cmp(b.holder())
        .then_with(|| Arc::as_ptr(a).cmp(&Arc::as_ptr(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use rust_decimal::prelude::FromPrimitive;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn decimal(amount: f64) -> Decimal {
        Decimal::from_f64(amount).unwrap()
    }

    fn amount(value: f64) -> Amount {
        Amount::new(decimal(value)).unwrap()
    }

    fn account(holder: &str, balance: f64) -> Arc<Account> {
        Arc::new(Account::new(holder, decimal(balance)).unwrap())
    }

    fn both_policies() -> [TransferCoordinator; 2] {
        [
            TransferCoordinator::new(TransferPolicy::Sequential),
            TransferCoordinator::new(TransferPolicy::Ordered),
        ]
    }

    #[test]
    fn test_repeated_transfer_scenario() {
        for coordinator in both_policies() {
            let a = account("Bach Lee", 1000.0);
            let b = account("Ben", 500.0);
            let c = account("Charlie", 300.0);
            for _ in 0..3 {
                coordinator.transfer(&a, &b, amount(75.0)).unwrap();
            }
            assert_eq!(a.balance(), decimal(775.0));
            assert_eq!(b.balance(), decimal(725.0));
            assert_eq!(c.balance(), decimal(300.0));
            assert_eq!(a.balance() + b.balance() + c.balance(), decimal(1800.0));
        }
    }

    #[test]
    fn test_insufficient_funds_has_no_side_effect() {
        for coordinator in both_policies() {
            let a = account("Bach Lee", 50.0);
            let b = account("Ben", 10.0);
            let err = coordinator.transfer(&a, &b, amount(75.0)).unwrap_err();
            assert!(matches!(err, LedgerError::InsufficientFunds { ref holder, .. } if holder == "Bach Lee"));
            assert_eq!(a.balance(), decimal(50.0));
            assert_eq!(b.balance(), decimal(10.0));
        }
    }

    #[test]
    fn test_receipt_reports_both_balances() {
        let a = account("Bach Lee", 100.0);
        let b = account("Ben", 0.0);
        let receipt = TransferCoordinator::default()
            .transfer(&a, &b, amount(30.0))
            .unwrap();
        assert_eq!(
            receipt,
            TransferReceipt {
                source_balance: decimal(70.0),
                target_balance: decimal(30.0),
            }
        );
    }

    #[test]
    fn test_transfer_to_self() {
        for coordinator in both_policies() {
            let a = account("Ben", 40.0);
            let receipt = coordinator.transfer(&a, &a, amount(40.0)).unwrap();
            assert_eq!(receipt.source_balance, decimal(40.0));
            assert!(coordinator.transfer(&a, &a, amount(41.0)).is_err());
            assert_eq!(a.balance(), decimal(40.0));
        }
    }

    #[test]
    fn test_lock_order_is_total_for_namesakes() {
        let a = account("Ben", 1.0);
        let b = account("Ben", 1.0);
        assert_eq!(lock_order(&a, &b), lock_order(&b, &a).reverse());
        assert_ne!(lock_order(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_opposite_transfers_complete_and_conserve() {
        for coordinator in both_policies() {
            let a = account("Bach Lee", 1000.0);
            let b = account("Ben", 1000.0);
            let (done_tx, done_rx) = mpsc::channel();

            for (source, target) in [(a.clone(), b.clone()), (b.clone(), a.clone())] {
                let done_tx = done_tx.clone();
                thread::spawn(move || {
                    for _ in 0..5_000 {
                        let _ = coordinator.transfer(&source, &target, amount(3.0));
                    }
                    done_tx.send(()).unwrap();
                });
            }

            for _ in 0..2 {
                done_rx
                    .recv_timeout(Duration::from_secs(30))
                    .expect("opposite-direction transfers deadlocked");
            }
            assert_eq!(a.balance() + b.balance(), decimal(2000.0));
            assert!(a.balance() >= Decimal::ZERO && b.balance() >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_ring_of_transfers_conserves_total() {
        for coordinator in both_policies() {
            let accounts = [account("Bach Lee", 1000.0), account("Ben", 500.0), account("Charlie", 300.0)];
            let handles: Vec<_> = (0..accounts.len())
                .map(|i| {
                    let source = accounts[i].clone();
                    let target = accounts[(i + 1) % accounts.len()].clone();
                    thread::spawn(move || {
                        for step in 0..2_000 {
                            let _ = coordinator.transfer(&source, &target, amount((step % 7) as f64 + 0.5));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            let total: Decimal = accounts.iter().map(|a| a.balance()).sum();
            assert_eq!(total, decimal(1800.0));
        }
    }
}
