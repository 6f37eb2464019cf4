pub mod orchestrator;
pub mod report;

pub use orchestrator::Runner;
pub use report::{BalanceLine, Report};
