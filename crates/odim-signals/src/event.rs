//! Lifecycle events

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Points in a schema's lifecycle where callbacks run
///
/// `PreInit` and `PreValidate` see the raw record read from the store.
/// Every other event sees a typed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
	PreInit,
	PostInit,
	PreValidate,
	PostValidate,
	PreSave,
	PostSave,
	PreRemove,
	PostRemove,
}

impl HookEvent {
	pub const ALL: [HookEvent; 8] = [
		HookEvent::PreInit,
		HookEvent::PostInit,
		HookEvent::PreValidate,
		HookEvent::PostValidate,
		HookEvent::PreSave,
		HookEvent::PostSave,
		HookEvent::PreRemove,
		HookEvent::PostRemove,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			HookEvent::PreInit => "pre_init",
			HookEvent::PostInit => "post_init",
			HookEvent::PreValidate => "pre_validate",
			HookEvent::PostValidate => "post_validate",
			HookEvent::PreSave => "pre_save",
			HookEvent::PostSave => "post_save",
			HookEvent::PreRemove => "pre_remove",
			HookEvent::PostRemove => "post_remove",
		}
	}

	/// Whether callbacks for this event receive the raw record
	pub fn takes_record(self) -> bool {
		matches!(self, HookEvent::PreInit | HookEvent::PreValidate)
	}
}

impl fmt::Display for HookEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for HookEvent {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		HookEvent::ALL
			.into_iter()
			.find(|event| event.as_str() == s)
			.ok_or_else(|| format!("unknown hook event `{}`", s))
	}
}
