//! Per-schema hook registry

use crate::error::{HookError, HookResult};
use crate::event::HookEvent;
use crate::subject::{HookContext, Record, Subject};
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Future returned by a boxed hook callback
pub type HookFuture<M> = BoxFuture<'static, HookResult<Option<Subject<M>>>>;

/// A boxed hook callback
///
/// Returning `Ok(Some(subject))` replaces the subject for the rest of the
/// chain. `Ok(None)` leaves it unchanged.
pub type HookFn<M> = Arc<dyn Fn(Subject<M>, HookContext) -> HookFuture<M> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum HookKey {
	Registration(u64),
	Uid(String),
}

struct HookEntry<M> {
	key: HookKey,
	callback: HookFn<M>,
}

/// Ordered hook callbacks for one schema
///
/// Callbacks run in registration order. Every plain `connect` appends, even
/// for a callback that is already registered. Only a callback connected under
/// an explicit uid is registered once per event.
///
/// # Examples
///
/// ```
/// use odim_signals::{HookContext, HookEvent, HookRegistry, Subject};
///
/// # tokio_test_block(async {
/// let hooks = HookRegistry::<String>::new();
/// hooks.connect(HookEvent::PreSave, |subject: Subject<String>, _ctx| async move {
/// 	let name = subject.into_instance().unwrap_or_default();
/// 	Ok(Some(Subject::Instance(name.to_uppercase())))
/// });
///
/// let saved = hooks
/// 	.run_instance(HookEvent::PreSave, "ada".to_string(), HookContext::saving("User", true))
/// 	.await
/// 	.unwrap();
/// assert_eq!(saved, "ADA");
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// # 	futures::executor::block_on(f)
/// # }
/// ```
pub struct HookRegistry<M> {
	hooks: RwLock<HashMap<HookEvent, Vec<HookEntry<M>>>>,
	next_registration: AtomicU64,
}

impl<M> Default for HookRegistry<M> {
	fn default() -> Self {
		Self {
			hooks: RwLock::new(HashMap::new()),
			next_registration: AtomicU64::new(0),
		}
	}
}

impl<M> fmt::Debug for HookRegistry<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let hooks = self.hooks.read();
		let counts: HashMap<_, _> = hooks.iter().map(|(e, v)| (*e, v.len())).collect();
		f.debug_struct("HookRegistry").field("hooks", &counts).finish()
	}
}

impl<M: Clone + Send + Sync + 'static> HookRegistry<M> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a callback for an event
	pub fn connect<F, Fut>(&self, event: HookEvent, callback: F)
	where
		F: Fn(Subject<M>, HookContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = HookResult<Option<Subject<M>>>> + Send + 'static,
	{
		self.insert(event, self.registration(), box_callback(callback));
	}

	/// Append a callback identified by `uid`
	///
	/// Returns `false`, leaving the registry unchanged, if `uid` is already
	/// registered for the event.
	pub fn connect_with_uid<F, Fut>(&self, event: HookEvent, uid: impl Into<String>, callback: F) -> bool
	where
		F: Fn(Subject<M>, HookContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = HookResult<Option<Subject<M>>>> + Send + 'static,
	{
		self.insert(event, HookKey::Uid(uid.into()), box_callback(callback))
	}

	/// Register one callback for several events
	///
	/// An event listed twice gains the callback once. Returns how many
	/// events gained it.
	pub fn connect_many<F, Fut>(&self, events: &[HookEvent], callback: F) -> usize
	where
		F: Fn(Subject<M>, HookContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = HookResult<Option<Subject<M>>>> + Send + 'static,
	{
		let key = self.registration();
		let boxed = box_callback(callback);
		events
			.iter()
			.filter(|event| self.insert(**event, key.clone(), Arc::clone(&boxed)))
			.count()
	}

	fn registration(&self) -> HookKey {
		HookKey::Registration(self.next_registration.fetch_add(1, Ordering::Relaxed))
	}

	fn insert(&self, event: HookEvent, key: HookKey, callback: HookFn<M>) -> bool {
		let mut hooks = self.hooks.write();
		let entries = hooks.entry(event).or_default();
		if entries.iter().any(|entry| entry.key == key) {
			return false;
		}
		entries.push(HookEntry { key, callback });
		true
	}

	/// Remove the callback registered under `uid`
	pub fn disconnect(&self, event: HookEvent, uid: &str) -> bool {
		let mut hooks = self.hooks.write();
		let Some(entries) = hooks.get_mut(&event) else {
			return false;
		};
		let before = entries.len();
		entries.retain(|entry| entry.key != HookKey::Uid(uid.to_string()));
		entries.len() < before
	}

	pub fn disconnect_all(&self) {
		self.hooks.write().clear();
	}

	pub fn receiver_count(&self, event: HookEvent) -> usize {
		self.hooks.read().get(&event).map_or(0, Vec::len)
	}

	/// Whether any of the events has at least one callback
	pub fn has_receivers(&self, events: &[HookEvent]) -> bool {
		let hooks = self.hooks.read();
		events
			.iter()
			.any(|event| hooks.get(event).is_some_and(|entries| !entries.is_empty()))
	}

	/// Run every callback for `event` in order and return the final subject
	pub async fn run(&self, event: HookEvent, subject: Subject<M>, ctx: HookContext) -> HookResult<Subject<M>> {
		let callbacks: Vec<HookFn<M>> = {
			let hooks = self.hooks.read();
			match hooks.get(&event) {
				Some(entries) => entries.iter().map(|entry| Arc::clone(&entry.callback)).collect(),
				None => return Ok(subject),
			}
		};

		tracing::trace!(%event, schema = ctx.schema, callbacks = callbacks.len(), "running hooks");
		let mut subject = subject;
		for callback in callbacks {
			if let Some(replacement) = callback(subject.clone(), ctx.clone()).await? {
				subject = replacement;
			}
		}
		Ok(subject)
	}

	/// Run an instance event and unwrap the resulting instance
	pub async fn run_instance(&self, event: HookEvent, instance: M, ctx: HookContext) -> HookResult<M> {
		match self.run(event, Subject::Instance(instance), ctx).await? {
			Subject::Instance(instance) => Ok(instance),
			other => Err(HookError::SubjectMismatch {
				event,
				expected: "instance",
				found: other.kind(),
			}),
		}
	}

	/// Run a record event and unwrap the resulting record
	pub async fn run_record(&self, event: HookEvent, record: Record, ctx: HookContext) -> HookResult<Record> {
		match self.run(event, Subject::Record(record), ctx).await? {
			Subject::Record(record) => Ok(record),
			other => Err(HookError::SubjectMismatch {
				event,
				expected: "record",
				found: other.kind(),
			}),
		}
	}
}

fn box_callback<M, F, Fut>(callback: F) -> HookFn<M>
where
	M: Send + 'static,
	F: Fn(Subject<M>, HookContext) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = HookResult<Option<Subject<M>>>> + Send + 'static,
{
	Arc::new(move |subject, ctx| callback(subject, ctx).boxed())
}
