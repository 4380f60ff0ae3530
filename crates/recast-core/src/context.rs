//! Run-scoped execution state
//!
//! One [`ExecutionContext`] lives for one top-level run and is shared by
//! reference with every recipe and every parallel worker of that run:
//! - Cooperative cancellation through a [`CancellationToken`]
//! - Typed messages keyed by string
//! - The error hook that decides whether a per-source failure is fatal

use crate::error::RecipeError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag
///
/// Clones share the same flag, so a token handed to a timer or another
/// thread cancels the run it was taken from. Cancellation is only observed at
/// the start of each recipe invocation; a visit in flight runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create new, not cancelled token
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Hook deciding what happens to a per-source failure
///
/// Returning `Ok(())` swallows the failure and the run continues. Returning
/// an error aborts the run with that error.
pub type ErrorHandler = Arc<dyn Fn(RecipeError) -> Result<(), RecipeError> + Send + Sync>;

type Message = Arc<dyn Any + Send + Sync>;

/// Shared state of one recipe run
///
/// Thread-safe: all methods take `&self`.
pub struct ExecutionContext {
    cancellation: CancellationToken,
    messages: DashMap<String, Message>,
    message_writes: AtomicU64,
    seen_writes: AtomicU64,
    errors: Mutex<Vec<RecipeError>>,
    on_error: Option<ErrorHandler>,
}

impl ExecutionContext {
    /// Fresh context: not cancelled, no messages, record-and-continue error hook
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            messages: DashMap::new(),
            message_writes: AtomicU64::new(0),
            seen_writes: AtomicU64::new(0),
            errors: Mutex::new(Vec::new()),
            on_error: None,
        }
    }

    /// Use an existing cancellation token
    #[inline]
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Replace the default record-and-continue error hook
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(RecipeError) -> Result<(), RecipeError> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Cancellation token of this run
    #[inline]
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Request cancellation of this run
    #[inline]
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Check if cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn put_message<V>(&self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        self.messages.insert(key.into(), Arc::new(value));
        self.message_writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Value stored under `key`
    ///
    /// Absent if nothing is stored or the stored value is not a `V`.
    #[must_use]
    pub fn get_message<V>(&self, key: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let message = self.messages.get(key).map(|entry| Arc::clone(entry.value()))?;
        message.downcast::<V>().ok()
    }

    /// Remove the value stored under `key`
    ///
    /// Returns `true` if something was removed.
    pub fn remove_message(&self, key: &str) -> bool {
        self.messages.remove(key).is_some()
    }

    /// Atomically replace the value under `key` with `f(current)`
    ///
    /// `current` is `None` if nothing is stored or the stored value is not a
    /// `V`. `f` runs while the entry is locked and must not touch this
    /// context's messages.
    pub fn compute_message<V, F>(&self, key: impl Into<String>, f: F) -> Arc<V>
    where
        V: Any + Send + Sync,
        F: FnOnce(Option<&V>) -> V,
    {
        let next = match self.messages.entry(key.into()) {
            Entry::Occupied(mut occupied) => {
                let current = Arc::clone(occupied.get()).downcast::<V>().ok();
                let next = Arc::new(f(current.as_deref()));
                let erased: Message = next.clone();
                occupied.insert(erased);
                next
            }
            Entry::Vacant(vacant) => {
                let next = Arc::new(f(None));
                let erased: Message = next.clone();
                vacant.insert(erased);
                next
            }
        };
        self.message_writes.fetch_add(1, Ordering::SeqCst);
        next
    }

    /// Check if any message was written since the last reset
    #[inline]
    #[must_use]
    pub fn has_new_messages(&self) -> bool {
        self.message_writes() != self.seen_writes.load(Ordering::SeqCst)
    }

    /// Clear the new-messages flag
    #[inline]
    pub fn reset_new_messages(&self) {
        self.seen_writes.store(self.message_writes(), Ordering::SeqCst);
    }

    /// Number of message writes so far in this run
    #[inline]
    pub(crate) fn message_writes(&self) -> u64 {
        self.message_writes.load(Ordering::SeqCst)
    }

    /// Route a per-source failure through the error hook
    ///
    /// Without a custom hook the error is logged, recorded and swallowed.
    ///
    /// # Errors
    /// Returns the error chosen by a custom hook to abort the run
    pub fn on_error(&self, error: RecipeError) -> Result<(), RecipeError> {
        match &self.on_error {
            Some(handler) => handler(error),
            None => {
                tracing::warn!(error = %error, "recipe failure recorded, continuing");
                self.errors.lock().push(error);
                Ok(())
            }
        }
    }

    /// Number of failures recorded by the default hook
    #[inline]
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Messages of the failures recorded by the default hook
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.lock().iter().map(ToString::to_string).collect()
    }

    /// Drain the failures recorded by the default hook
    pub fn take_errors(&self) -> Vec<RecipeError> {
        std::mem::take(&mut *self.errors.lock())
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.is_cancelled())
            .field("messages", &self.messages.len())
            .field("errors", &self.error_count())
            .field("custom_error_handler", &self.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_tree::{SourcePath, VisitError};
    use std::thread;

    fn failure(recipe: &str) -> RecipeError {
        RecipeError::VisitFailed {
            recipe: recipe.to_string(),
            source_path: SourcePath::single("a.txt"),
            cause: VisitError::failed("boom"),
        }
    }

    #[test]
    fn token_clones_share_the_flag() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn context_observes_external_token() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::new().with_cancellation(token.clone());

        thread::spawn(move || token.cancel()).join().unwrap();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn messages_are_typed() {
        let ctx = ExecutionContext::new();
        ctx.put_message("count", 3_usize);

        assert_eq!(ctx.get_message::<usize>("count").as_deref(), Some(&3));
        assert!(ctx.get_message::<String>("count").is_none());
        assert!(ctx.get_message::<usize>("missing").is_none());
    }

    #[test]
    fn remove_message_reports_presence() {
        let ctx = ExecutionContext::new();
        ctx.put_message("k", "v".to_string());
        assert!(ctx.remove_message("k"));
        assert!(!ctx.remove_message("k"));
    }

    #[test]
    fn compute_message_updates_in_place() {
        let ctx = ExecutionContext::new();
        for _ in 0..3 {
            ctx.compute_message::<Vec<String>, _>("seen", |current| {
                let mut next = current.cloned().unwrap_or_default();
                next.push("x".to_string());
                next
            });
        }
        assert_eq!(ctx.get_message::<Vec<String>>("seen").unwrap().len(), 3);
    }

    #[test]
    fn compute_message_is_safe_across_threads() {
        let ctx = Arc::new(ExecutionContext::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for _ in 0..100 {
                        ctx.compute_message::<usize, _>("n", |n| n.copied().unwrap_or(0) + 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ctx.get_message::<usize>("n").as_deref(), Some(&800));
    }

    #[test]
    fn new_messages_flag_resets() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.has_new_messages());
        ctx.put_message("k", 1_u8);
        assert!(ctx.has_new_messages());
        ctx.reset_new_messages();
        assert!(!ctx.has_new_messages());
    }

    #[test]
    fn message_writes_survive_reset() {
        let ctx = ExecutionContext::new();
        ctx.put_message("k", 1_u8);
        ctx.compute_message::<u8, _>("k", |n| n.copied().unwrap_or(0) + 1);
        ctx.reset_new_messages();
        assert_eq!(ctx.message_writes(), 2);
        assert!(!ctx.has_new_messages());
    }

    #[test]
    fn default_hook_records_and_continues() {
        let ctx = ExecutionContext::new();
        assert!(ctx.on_error(failure("a")).is_ok());
        assert!(ctx.on_error(failure("b")).is_ok());

        assert_eq!(ctx.error_count(), 2);
        assert!(ctx.error_messages()[0].contains("'a'"));
        assert_eq!(ctx.take_errors().len(), 2);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn custom_hook_can_escalate() {
        let ctx = ExecutionContext::new()
            .with_error_handler(|e| Err(RecipeError::aborted(e.to_string())));

        let result = ctx.on_error(failure("a"));
        assert!(matches!(result, Err(RecipeError::Aborted(_))));
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn errors_are_not_messages() {
        let ctx = ExecutionContext::new();
        ctx.on_error(failure("a")).unwrap();
        assert!(!ctx.has_new_messages());
    }
}
