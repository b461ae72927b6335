//! Per-task retry: backoff calculation plus the attempt-loop driver.

pub mod backoff;
pub mod driver;

pub use backoff::calculate_delay;
pub use driver::try_with_retry;
