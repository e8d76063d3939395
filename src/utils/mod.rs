pub mod constants;
mod errors;
pub mod timeout;

pub use errors::{ErrorCategory, ScrapeError};
pub use timeout::{DeadlineError, race_with_deadline, until_cancelled, validate_budget_ms};
