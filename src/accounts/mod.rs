pub mod account;
pub mod amount;

pub use account::Account;
pub use amount::Amount;
