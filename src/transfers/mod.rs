pub mod coordinator;

pub use coordinator::{TransferCoordinator, TransferPolicy, TransferReceipt};
