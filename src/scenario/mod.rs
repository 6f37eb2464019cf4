pub mod scenario;

pub use scenario::{AccountRecord, OperationRecord, OperationType, Scenario};
