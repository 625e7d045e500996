//! Fixed-delay retry for reads

use crate::error::Result;
use odim_conf::RetryPolicy;
use std::future::Future;

/// Run `attempt` until it succeeds, fails permanently, or the policy runs out
///
/// Only errors for which [`OdimError::is_transient`] holds are retried. The
/// last error is returned once `policy.attempts` retries have been used.
///
/// [`OdimError::is_transient`]: crate::error::OdimError::is_transient
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut attempt: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut retries = 0;
	loop {
		match attempt().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_transient() && retries < policy.attempts => {
				retries += 1;
				tracing::warn!(
					operation,
					attempt = retries,
					max_attempts = policy.attempts,
					error = %err,
					"transient error, retrying"
				);
				tokio::time::sleep(policy.delay()).await;
			}
			Err(err) => return Err(err),
		}
	}
}
