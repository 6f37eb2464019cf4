use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use csv::ReaderBuilder;
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::accounts::{Account, Amount};
use crate::error::{LedgerError, LedgerResult};
use crate::workers::{Operation, Step, Worker};

#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub holder: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Deposit,
    Withdraw,
    Transfer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationRecord {
    pub worker: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub account: String,
    pub amount: Decimal,
    pub target: Option<String>,
    pub pause_ms: Option<u64>,
}

/// Accounts plus the workers scripted against them, ready to hand to a runner.
#[derive(Debug)]
pub struct Scenario {
    pub accounts: Vec<Arc<Account>>,
    pub workers: Vec<Worker>,
}

impl Scenario {
    pub fn from_csv(accounts: impl AsRef<Path>, operations: impl AsRef<Path>) -> LedgerResult<Self> {
        let accounts = File::open(accounts)?;
        let operations = File::open(operations)?;
        Self::from_readers(accounts, operations)
    }

    pub fn from_readers<A: Read, O: Read>(accounts: A, operations: O) -> LedgerResult<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(accounts);
        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let record: AccountRecord = result?;
            records.push(record);
        }

        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(operations);
        let mut operations = Vec::new();
        for result in rdr.deserialize() {
            let record: OperationRecord = result?;
            operations.push(record);
        }

        Self::build(records, operations)
    }

    pub fn build(accounts: Vec<AccountRecord>, operations: Vec<OperationRecord>) -> LedgerResult<Self> {
        let mut by_holder: HashMap<String, Arc<Account>> = HashMap::new();
        let mut ordered = Vec::with_capacity(accounts.len());
        for record in accounts {
            if by_holder.contains_key(&record.holder) {
                return Err(LedgerError::DuplicateAccount(record.holder));
            }
            let account = Arc::new(Account::new(record.holder.clone(), record.balance)?);
            by_holder.insert(record.holder, Arc::clone(&account));
            ordered.push(account);
        }

        let lookup = |holder: &str| {
            by_holder
                .get(holder)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownAccount(holder.to_string()))
        };

        // Workers keep the order their names first appear in; steps keep row order.
        let mut names: Vec<String> = Vec::new();
        let mut scripts: HashMap<String, Vec<Step>> = HashMap::new();
        for record in operations {
            let amount = Amount::new(record.amount)?;
            let account = lookup(&record.account)?;
            let operation = match record.op_type {
                OperationType::Deposit => Operation::Deposit { account, amount },
                OperationType::Withdraw => Operation::Withdraw { account, amount },
                OperationType::Transfer => {
                    let target = record
                        .target
                        .as_deref()
                        .filter(|target| !target.is_empty())
                        .ok_or_else(|| LedgerError::MissingTarget {
                            worker: record.worker.clone(),
                        })?;
                    Operation::Transfer {
                        source: account,
                        target: lookup(target)?,
                        amount,
                    }
                }
            };
            let pause = Duration::from_millis(record.pause_ms.unwrap_or(0));
            if !scripts.contains_key(&record.worker) {
                names.push(record.worker.clone());
            }
            scripts
                .entry(record.worker)
                .or_default()
                .push(Step::new(operation, pause));
        }

        let workers = names
            .into_iter()
            .map(|name| {
                let steps = scripts.remove(&name).unwrap_or_default();
                Worker::new(name, steps)
            })
            .collect::<Vec<_>>();

        debug!(
            "scenario loaded: {} accounts, {} workers",
            ordered.len(),
            workers.len()
        );
        Ok(Self {
            accounts: ordered,
            workers,
        })
    }

    /// Three customers who each deposit 100 into their own account, withdraw
    /// 150 from it, then transfer 75 to the next customer in the ring.
    pub fn demo() -> LedgerResult<Self> {
        let accounts = [("Bach Lee", 1000), ("Ben", 500), ("Charlie", 300)]
            .into_iter()
            .map(|(holder, balance)| AccountRecord {
                holder: holder.to_string(),
                balance: Decimal::from(balance),
            })
            .collect::<Vec<_>>();

        let mut operations = Vec::new();
        for (i, source) in accounts.iter().enumerate() {
            let target = &accounts[(i + 1) % accounts.len()];
            let worker = format!("{}-Operations", source.holder.split(' ').next().unwrap_or_default());
            let row = |op_type, amount: i64, target: Option<&str>, pause_ms| OperationRecord {
                worker: worker.clone(),
                op_type,
                account: source.holder.clone(),
                amount: Decimal::from(amount),
                target: target.map(str::to_string),
                pause_ms: Some(pause_ms),
            };
            operations.push(row(OperationType::Deposit, 100, None, 500));
            operations.push(row(OperationType::Withdraw, 150, None, 300));
            operations.push(row(OperationType::Transfer, 75, Some(&target.holder), 0));
        }

        Self::build(accounts, operations)
    }
}
