use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;

use crate::accounts::Amount;
use crate::error::{LedgerError, LedgerResult};

/// A holder's balance behind its own lock.
///
/// Every read and write of the balance happens while the lock is held, and no
/// method holds it while waiting on anything else.
#[derive(Debug)]
pub struct Account {
    holder: String,
    balance: Mutex<Decimal>,
}

impl Account {
    pub fn new(holder: impl Into<String>, initial_balance: Decimal) -> LedgerResult<Self> {
        let initial_balance = Amount::new(initial_balance)?.value();
        Ok(Self {
            holder: holder.into(),
            balance: Mutex::new(initial_balance),
        })
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Adds `amount` and returns the resulting balance.
    pub fn deposit(&self, amount: Amount) -> Decimal {
        let mut balance = self.lock();
        credit(&mut balance, amount)
    }

    /// Subtracts `amount` if the balance covers it and returns the resulting balance.
    /// An uncovered withdrawal leaves the balance untouched.
    pub fn withdraw(&self, amount: Amount) -> LedgerResult<Decimal> {
        let mut balance = self.lock();
        debit(&self.holder, &mut balance, amount)
    }

    pub fn balance(&self) -> Decimal {
        *self.lock()
    }

    // A poisoned guard still holds a whole balance: mutations are single assignments.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Decimal> {
        self.balance.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn credit(balance: &mut Decimal, amount: Amount) -> Decimal {
    *balance += amount.value();
    *balance
}

pub(crate) fn debit(holder: &str, balance: &mut Decimal, amount: Amount) -> LedgerResult<Decimal> {
    if amount.value() > *balance {
        return Err(LedgerError::InsufficientFunds {
            holder: holder.to_string(),
            requested: amount.value(),
            available: *balance,
        });
    }
    *balance -= amount.value();
    Ok(*balance)
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account Holder: {}, Balance: ${}", self.holder, self.balance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;
    use std::sync::Arc;
    use std::thread;

    fn decimal(amount: f64) -> Decimal {
        Decimal::from_f64(amount).unwrap()
    }

    fn amount(value: f64) -> Amount {
        Amount::new(decimal(value)).unwrap()
    }

    #[test]
    fn test_deposit() {
        let acc = Account::new("Ben", decimal(500.0)).unwrap();
        assert_eq!(acc.deposit(amount(100.0)), decimal(600.0));
        assert_eq!(acc.balance(), decimal(600.0));
    }

    #[test]
    fn test_withdraw() {
        let acc = Account::new("Ben", decimal(100.0)).unwrap();
        assert_eq!(acc.withdraw(amount(40.0)).unwrap(), decimal(60.0));
        assert_eq!(acc.withdraw(amount(60.0)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_overdraw_is_rejected_and_balance_kept() {
        let acc = Account::new("Ben", decimal(100.0)).unwrap();
        let err = acc.withdraw(amount(150.0)).unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                holder,
                requested,
                available,
            } => {
                assert_eq!(holder, "Ben");
                assert_eq!(requested, decimal(150.0));
                assert_eq!(available, decimal(100.0));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(acc.balance(), decimal(100.0));
    }

    #[test]
    fn test_second_withdrawal_fails_after_first_drains() {
        let acc = Account::new("Bach Lee", decimal(100.0)).unwrap();
        assert_eq!(acc.withdraw(amount(60.0)).unwrap(), decimal(40.0));
        assert!(matches!(
            acc.withdraw(amount(60.0)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(acc.balance(), decimal(40.0));
    }

    #[test]
    fn test_negative_initial_balance_rejected() {
        assert!(matches!(
            Account::new("Charlie", decimal(-1.0)),
            Err(LedgerError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_display() {
        let acc = Account::new("Charlie", decimal(300.5)).unwrap();
        assert_eq!(acc.to_string(), "Account Holder: Charlie, Balance: $300.5");
    }

    #[test]
    fn test_concurrent_deposits_are_not_lost() {
        let acc = Arc::new(Account::new("Ben", Decimal::ZERO).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        acc.deposit(amount(0.25));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(acc.balance(), decimal(2_000.0));
    }

    #[test]
    fn test_concurrent_withdrawals_never_overdraw() {
        let acc = Arc::new(Account::new("Ben", decimal(1_000.0)).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    (0..200)
                        .filter(|_| acc.withdraw(amount(1.0)).is_ok())
                        .count()
                })
            })
            .collect();
        let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(succeeded, 1_000);
        assert_eq!(acc.balance(), Decimal::ZERO);
    }
}
