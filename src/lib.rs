pub mod accounts;
pub mod error;
pub mod orchestrator;
pub mod scenario;
pub mod transfers;
pub mod workers;

pub use accounts::{Account, Amount};
pub use error::{LedgerError, LedgerResult};
pub use orchestrator::{Report, Runner};
pub use scenario::Scenario;
pub use transfers::{TransferCoordinator, TransferPolicy};
pub use workers::{CancellationToken, Worker};
