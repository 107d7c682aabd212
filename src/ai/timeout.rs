//! Request Timeouts
//!
//! Wraps vendor calls so a stalled backend surfaces as
//! `TestWeaveError::Timeout`, which the classifier routes to the network
//! recovery strategy.

use std::future::Future;
use std::time::Duration;

use crate::types::{Result, TestWeaveError};

/// Execute an async operation with a timeout
///
/// Returns `TestWeaveError::Timeout` if the operation doesn't complete within
/// `timeout`. The inner future is dropped on expiry.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TestWeaveError::timeout(operation_name, timeout)),
    }
}

/// Like [`with_timeout`] for futures that cannot fail
pub async fn with_timeout_map<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| TestWeaveError::timeout(operation_name, timeout))
}
