//! Interceptor chains.
//!
//! An [`Interceptor`] is a pair of optional handlers: one for a fulfilled value, one
//! for a rejection. An [`InterceptorManager`] keeps them in registration order and
//! folds a value through all of them with [`InterceptorManager::run`].
//!
//! Each stage receives the previous stage's outcome. A fulfilled value goes to the
//! next `on_fulfilled` handler, a rejection to the next `on_rejected` handler; a
//! missing handler passes the outcome through unchanged. A rejection handler may
//! recover by returning `Ok`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

/// Handler for a fulfilled value.
pub type Fulfilled<T, E> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Handler for a rejection.
pub type Rejected<T, E> = Arc<dyn Fn(E) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// A fulfilled/rejected handler pair.
///
/// # Example
///
/// ```
/// use fetchline::{FetchConfig, Interceptor, Error};
///
/// let add_header = Interceptor::<FetchConfig, Error>::fulfilled(|mut config| async move {
///     config.set_header("X-Client", "fetchline");
///     Ok(config)
/// });
/// ```
pub struct Interceptor<T, E> {
    on_fulfilled: Option<Fulfilled<T, E>>,
    on_rejected: Option<Rejected<T, E>>,
}

impl<T, E> Clone for Interceptor<T, E> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: self.on_fulfilled.clone(),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

impl<T, E> Default for Interceptor<T, E> {
    fn default() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }
}

impl<T, E> fmt::Debug for Interceptor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

impl<T, E> Interceptor<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create an interceptor that passes everything through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interceptor with only a fulfilled handler.
    #[must_use]
    pub fn fulfilled<F, Fut>(handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new().on_fulfilled(handler)
    }

    /// Create an interceptor with only a rejected handler.
    #[must_use]
    pub fn rejected<F, Fut>(handler: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new().on_rejected(handler)
    }

    /// Set the fulfilled handler.
    #[must_use]
    pub fn on_fulfilled<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.on_fulfilled = Some(Arc::new(
            move |value| -> BoxFuture<'static, Result<T, E>> { Box::pin(handler(value)) },
        ));
        self
    }

    /// Set the rejected handler.
    #[must_use]
    pub fn on_rejected<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(
            move |error| -> BoxFuture<'static, Result<T, E>> { Box::pin(handler(error)) },
        ));
        self
    }

    /// Apply this stage to the previous outcome.
    pub async fn apply(&self, input: Result<T, E>) -> Result<T, E> {
        match input {
            Ok(value) => match &self.on_fulfilled {
                Some(handler) => handler(value).await,
                None => Ok(value),
            },
            Err(error) => match &self.on_rejected {
                Some(handler) => handler(error).await,
                None => Err(error),
            },
        }
    }
}

/// Handle returned by [`InterceptorManager::add`], used to eject the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

/// Ordered list of interceptors.
///
/// Ejected slots are kept empty so that handles stay valid.
pub struct InterceptorManager<T, E> {
    entries: Vec<Option<Interceptor<T, E>>>,
}

impl<T, E> Clone for InterceptorManager<T, E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T, E> Default for InterceptorManager<T, E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T, E> fmt::Debug for InterceptorManager<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("active", &self.len())
            .field("slots", &self.entries.len())
            .finish()
    }
}

impl<T, E> InterceptorManager<T, E> {
    /// Remove an interceptor.
    ///
    /// Returns `false` if the handle was already ejected or is unknown.
    pub fn eject(&mut self, id: InterceptorId) -> bool {
        self.entries
            .get_mut(id.0)
            .and_then(Option::take)
            .is_some()
    }

    /// Remove every interceptor.
    ///
    /// Slots are kept, so handles issued before the call never match a later
    /// interceptor.
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|slot| *slot = None);
    }

    /// Active interceptors, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Interceptor<T, E>> {
        self.entries.iter().flatten()
    }

    /// Number of active interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if no interceptor is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<T, E> InterceptorManager<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; it runs after every interceptor added before it.
    pub fn add(&mut self, interceptor: Interceptor<T, E>) -> InterceptorId {
        self.entries.push(Some(interceptor));
        InterceptorId(self.entries.len() - 1)
    }

    /// Fold an outcome through every active interceptor, in order.
    pub async fn run(&self, input: Result<T, E>) -> Result<T, E> {
        let mut outcome = input;
        for interceptor in self.iter() {
            outcome = interceptor.apply(outcome).await;
        }
        outcome
    }
}

impl<T, E> Extend<Interceptor<T, E>> for InterceptorManager<T, E> {
    fn extend<I: IntoIterator<Item = Interceptor<T, E>>>(&mut self, iter: I) {
        self.entries.extend(iter.into_iter().map(Some));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    type Chain = InterceptorManager<Vec<&'static str>, String>;

    fn push(label: &'static str) -> Interceptor<Vec<&'static str>, String> {
        Interceptor::fulfilled(move |mut trace: Vec<&'static str>| async move {
            trace.push(label);
            Ok(trace)
        })
    }

    #[tokio::test]
    async fn runs_in_registration_order() {
        let mut chain = Chain::new();
        chain.add(push("a"));
        chain.add(push("b"));
        chain.add(push("c"));

        let trace = chain.run(Ok(Vec::new())).await.expect("fulfilled");
        assert_eq!(trace, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn eject_is_idempotent() {
        let mut chain = Chain::new();
        chain.add(push("a"));
        let b = chain.add(push("b"));
        chain.add(push("c"));

        assert!(chain.eject(b));
        assert!(!chain.eject(b));
        assert!(!chain.eject(InterceptorId(42)));
        assert_eq!(chain.len(), 2);

        let trace = chain.run(Ok(Vec::new())).await.expect("fulfilled");
        assert_eq!(trace, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn rejection_skips_fulfilled_handlers() {
        let mut chain = Chain::new();
        chain.add(Interceptor::fulfilled(|_: Vec<&'static str>| async {
            Err("boom".to_string())
        }));
        chain.add(push("skipped"));

        let error = chain.run(Ok(Vec::new())).await.expect_err("rejected");
        assert_eq!(error, "boom");
    }

    #[tokio::test]
    async fn rejected_handler_may_recover() {
        let mut chain = Chain::new();
        chain.add(Interceptor::rejected(|error: String| async move {
            Ok(vec![if error == "boom" { "recovered" } else { "other" }])
        }));
        chain.add(push("next"));

        let trace = chain.run(Err("boom".to_string())).await.expect("recovered");
        assert_eq!(trace, vec!["recovered", "next"]);
    }

    #[tokio::test]
    async fn handlers_see_each_outcome_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut chain = Chain::new();
        let seen = Arc::clone(&calls);
        chain.add(
            Interceptor::new()
                .on_fulfilled({
                    let seen = Arc::clone(&seen);
                    move |trace: Vec<&'static str>| {
                        seen.lock().expect("lock").push("fulfilled");
                        async move { Ok(trace) }
                    }
                })
                .on_rejected(move |error: String| {
                    seen.lock().expect("lock").push("rejected");
                    async move { Err(error) }
                }),
        );

        let _ = chain.run(Ok(Vec::new())).await;
        let _ = chain.run(Err("x".to_string())).await;
        assert_eq!(*calls.lock().expect("lock"), vec!["fulfilled", "rejected"]);
    }

    #[test]
    fn empty_manager() {
        let mut chain = Chain::new();
        assert!(chain.is_empty());
        chain.add(Interceptor::new());
        assert!(!chain.is_empty());
        chain.clear();
        assert!(chain.is_empty());
    }

    #[tokio::test]
    async fn handles_from_before_clear_stay_stale() {
        let mut chain = Chain::new();
        let stale = chain.add(push("a"));
        chain.clear();
        chain.add(push("b"));

        assert!(!chain.eject(stale));
        assert_eq!(chain.len(), 1);

        let trace = chain.run(Ok(Vec::new())).await.expect("fulfilled");
        assert_eq!(trace, vec!["b"]);
    }

    #[test]
    fn debug_reports_active_interceptors() {
        let mut chain = Chain::new();
        let a = chain.add(push("a"));
        chain.add(push("b"));
        chain.eject(a);

        let debug = format!("{chain:?}");
        assert!(debug.contains("active: 1"));
        assert!(debug.contains("slots: 2"));
    }
}
