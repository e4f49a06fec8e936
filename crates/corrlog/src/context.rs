//! Request-scoped context and correlation IDs
//!
//! A [`Context`] is an immutable bag of values that travels with a request.
//! Deriving a new context never touches the original, so a handler can hand
//! the same base context to several sub-tasks and tag each one differently.
//!
//! ```ignore
//! let ctx = Context::background().with_correlation_id(generate_correlation_id());
//! logger.info_with_context(Some(&ctx), "request accepted");
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Key the correlation ID is stored under
pub const CORRELATION_ID_KEY: &str = "correlation_id";

type Value = Arc<dyn Any + Send + Sync>;

tokio::task_local! {
    static CURRENT_CONTEXT: Context;
}

/// Immutable request context
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<HashMap<&'static str, Value>>,
}

impl Context {
    /// Empty root context
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context with `key` bound to `value`
    pub fn with_value<T>(&self, key: &'static str, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut values = (*self.values).clone();
        values.insert(key, Arc::new(value));
        Self {
            values: Arc::new(values),
        }
    }

    /// Typed lookup. A missing key and a value of another type both give `None`.
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Derive a context carrying `id` as its correlation ID
    pub fn with_correlation_id(&self, id: impl Into<String>) -> Self {
        self.with_value(CORRELATION_ID_KEY, id.into())
    }

    /// Correlation ID stored on this context, if it is a string
    pub fn correlation_id(&self) -> Option<&str> {
        self.value::<String>(CORRELATION_ID_KEY).map(String::as_str)
    }

    /// Run `future` with this context installed as the task's current context
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        CURRENT_CONTEXT.scope(self, future).await
    }

    /// Context installed by an enclosing [`Context::scope`], if any
    pub fn current() -> Option<Context> {
        CURRENT_CONTEXT.try_with(Context::clone).ok()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Context")
            .field("keys", &keys)
            .field("correlation_id", &self.correlation_id())
            .finish()
    }
}

/// Fresh random correlation ID (hyphenated UUID v4, 36 characters)
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derive a context carrying `id`. A missing base context starts from
/// [`Context::background`].
pub fn with_correlation_id(ctx: Option<&Context>, id: impl Into<String>) -> Context {
    match ctx {
        Some(ctx) => ctx.with_correlation_id(id),
        None => Context::background().with_correlation_id(id),
    }
}

/// Correlation ID carried by `ctx`, or an empty string when there is no
/// context, no ID, or a value of the wrong type under the key.
pub fn correlation_id_from_context(ctx: Option<&Context>) -> String {
    ctx.and_then(Context::correlation_id)
        .map(str::to_string)
        .unwrap_or_default()
}
