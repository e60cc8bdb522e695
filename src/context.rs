//! Request-scoped key/value store.
//!
//! A finalized chain allocates one [`Context`] per request and hands a shared
//! reference to every middleware constructor and to the terminal handler
//! constructor. Whatever one stage puts in, every stage that runs *after it
//! in the call stack* can read.
//!
//! # Visibility follows the call stack
//!
//! A middleware that writes a key before calling `next` makes it visible to
//! every later stage. A write made after `next` returns is only seen by the
//! stages that are still on the stack (the ones declared earlier) and by
//! code that inspects the context once the whole chain has returned.
//!
//! # Crossing into other tasks
//!
//! The handler graph only ever holds `&Context`, which cannot be moved into
//! `tokio::spawn`. Take a [`snapshot`](Context::snapshot) instead: it is an
//! owned, independent copy of the current entries.
//!
//! # Typed access
//!
//! Values are stored untyped and downcast on read. Middleware that owns a
//! well-known key should export a small typed getter/setter pair for it
//! rather than making callers repeat the key and the type, as
//! [`request_id::get`](crate::middleware::request_id::get) does.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A shared, type-erased context value.
pub(crate) type Value = Arc<dyn Any + Send + Sync>;

/// Per-request key/value store shared by every stage of one chain run.
///
/// ```rust
/// use stack::Context;
///
/// let ctx = Context::new();
/// ctx.put("token", String::from("xyz"));
///
/// assert_eq!(ctx.get::<String>("token").as_deref(), Some("xyz"));
/// assert_eq!(ctx.get::<u64>("token"), None); // wrong type
/// assert_eq!(ctx.get::<String>("user"), None); // missing key
/// ```
#[derive(Default)]
pub struct Context {
    // Locked only for the duration of a single call, never across an await.
    values: Mutex<HashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self { values: Mutex::new(values.into_iter().collect()) }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        // A panicking stage cannot leave the map half-written: every
        // operation is a single HashMap call.
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key`. Last write wins.
    pub fn put<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.lock().insert(key.into(), Arc::new(value));
    }

    /// Returns a clone of the value under `key`.
    ///
    /// `None` when the key is missing or holds a value of another type.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Any + Clone,
    {
        self.get_ref(key, T::clone)
    }

    /// Calls `f` with a borrow of the value under `key`, without cloning it.
    ///
    /// `f` runs with the context unlocked, so it may read or write the same
    /// context.
    pub fn get_ref<T, R>(&self, key: &str, f: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: Any,
    {
        let value = Arc::clone(self.lock().get(key)?);
        value.downcast_ref::<T>().map(f)
    }

    /// Removes `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All keys currently set, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// An owned copy of the current entries.
    ///
    /// The copy is independent: puts and removes on either side are not seen
    /// by the other. Values themselves are shared, not deep-cloned.
    ///
    /// ```rust
    /// use stack::Context;
    ///
    /// let ctx = Context::new();
    /// ctx.put("user", String::from("alice"));
    ///
    /// let copy = ctx.snapshot();
    /// ctx.put("user", String::from("bob"));
    ///
    /// assert_eq!(copy.get::<String>("user").as_deref(), Some("alice"));
    /// ```
    pub fn snapshot(&self) -> Context {
        Self::with_values(self.lock().iter().map(|(k, v)| (k.clone(), Arc::clone(v))))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("keys", &self.keys()).finish()
    }
}
