//! Hook errors

use crate::event::HookEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
	/// A callback refused the subject
	#[error("{event} hook rejected the {schema}: {message}")]
	Rejected {
		event: HookEvent,
		schema: &'static str,
		message: String,
	},

	/// A callback returned a raw record where an instance was expected, or the reverse
	#[error("{event} hook returned a {found} where a {expected} was expected")]
	SubjectMismatch {
		event: HookEvent,
		expected: &'static str,
		found: &'static str,
	},
}

impl HookError {
	/// Build the error a callback returns to abort the operation
	pub fn rejected(event: HookEvent, schema: &'static str, message: impl Into<String>) -> Self {
		HookError::Rejected {
			event,
			schema,
			message: message.into(),
		}
	}
}

pub type HookResult<T> = Result<T, HookError>;
