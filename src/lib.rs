pub mod config;
pub mod logging;
pub mod retry;

pub use retry::{
    is_recoverable, retry, retry_with_data, unrecoverable, Attempt, CancelToken, Cancelled,
    Config, RetryError, StopReason,
};
