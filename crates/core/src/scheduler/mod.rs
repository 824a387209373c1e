//! Recurring invocation of the harvest pipeline.
//!
//! One run happens at start (unless disabled), then a coarse poll checks
//! whether the configured interval has elapsed. A run may therefore start
//! up to one poll period late.

mod runner;
mod types;

pub use runner::{is_due, Scheduler};
pub use types::{SchedulerError, SchedulerStatus};
