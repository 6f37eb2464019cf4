pub mod cancel;
pub mod worker;

pub use cancel::CancellationToken;
pub use worker::{Operation, OperationKind, OperationOutcome, OutcomeStatus, Step, Worker, WorkerExit};
