use rust_decimal::Decimal;

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("insufficient funds in {holder}'s account: requested {requested}, available {available}")]
    InsufficientFunds {
        holder: String,
        requested: Decimal,
        available: Decimal,
    },
    #[error("{worker} interrupted")]
    Interrupted { worker: String },
    #[error("amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
    #[error("unknown account holder {0:?}")]
    UnknownAccount(String),
    #[error("account holder {0:?} declared more than once")]
    DuplicateAccount(String),
    #[error("transfer issued by {worker} has no target account")]
    MissingTarget { worker: String },
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
