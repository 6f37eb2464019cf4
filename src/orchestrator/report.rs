use std::io::Write;
use std::sync::Arc;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::accounts::Account;
use crate::error::LedgerResult;
use crate::workers::WorkerExit;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceLine {
    pub holder: String,
    pub balance: Decimal,
}

/// Final state of a run, read after every worker has stopped.
#[derive(Debug, Clone)]
pub struct Report {
    pub balances: Vec<BalanceLine>,
    pub workers: Vec<WorkerExit>,
}

impl Report {
    pub fn snapshot(accounts: &[Arc<Account>], workers: Vec<WorkerExit>) -> Self {
        let balances = accounts
            .iter()
            .map(|account| BalanceLine {
                holder: account.holder().to_string(),
                balance: account.balance(),
            })
            .collect();
        Self { balances, workers }
    }

    pub fn total(&self) -> Decimal {
        self.balances.iter().map(|line| line.balance).sum()
    }

    pub fn balance_of(&self, holder: &str) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|line| line.holder == holder)
            .map(|line| line.balance)
    }

    pub fn interrupted_workers(&self) -> impl Iterator<Item = &str> {
        self.workers
            .iter()
            .filter(|exit| exit.interrupted)
            .map(|exit| exit.name.as_str())
    }

    /// Writes `holder,balance` rows, balances rounded to 4 decimal places.
    pub fn write_csv<W: Write>(&self, writer: W) -> LedgerResult<()> {
        let mut wtr = Writer::from_writer(writer);
        wtr.write_record(["holder", "balance"])?;
        for line in &self.balances {
            wtr.serialize((&line.holder, line.balance.round_dp(4)))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
