mod backoff;
pub use backoff::BackoffStrategy;

mod jitter;
pub use jitter::JitterStrategy;

mod retry;
pub use retry::RetryPolicy;

mod exit;
pub use exit::ExitPolicy;
