//! Parameter and secret fetching.
//!
//! [`ParameterStoreDecorator`] fetches a fixed list of named values from a
//! [`ParameterStore`] before every invocation and attaches them to the
//! [`Context`] as [`Parameters`]. Nothing is cached: each invocation reads
//! the store afresh.
//!
//! A failed fetch aborts the invocation with [`InvocationError::Store`];
//! no response is synthesized for it.
//!
//! # Example
//!
//! ```
//! use lambda_decorators_core::{handler_fn, Context, Event, Handler};
//! use lambda_decorators_middleware::stages::{MemoryParameterStore, ParameterStoreDecorator, Parameters};
//! use lambda_decorators_middleware::HandlerExt;
//! use serde_json::json;
//!
//! let store = MemoryParameterStore::new().with("/app/db_url", "postgres://db");
//!
//! let handler = handler_fn(|_event: Event, ctx: &mut Context| {
//!     let params = ctx.get_extension::<Parameters>().unwrap();
//!     Ok(json!(params.get("/app/db_url")))
//! })
//! .decorate(ParameterStoreDecorator::new(store, ["/app/db_url"]));
//!
//! let response = handler.call(Event::new(), &mut Context::new("r")).unwrap();
//! assert_eq!(response, json!("postgres://db"));
//! ```

use crate::decorator::{Before, Decorator};
use lambda_decorators_core::{Context, Event, InvocationResult, StoreError};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A key-value store of configuration values and secrets.
pub trait ParameterStore: Send + Sync + 'static {
    /// Fetches one value.
    fn get(&self, name: &str) -> Result<String, StoreError>;

    /// Fetches several values, failing on the first that cannot be read.
    ///
    /// Stores with a batch API override this.
    fn get_many(&self, names: &[String]) -> Result<Vec<(String, String)>, StoreError> {
        names
            .iter()
            .map(|name| self.get(name).map(|value| (name.clone(), value)))
            .collect()
    }
}

impl<S: ParameterStore + ?Sized> ParameterStore for Arc<S> {
    fn get(&self, name: &str) -> Result<String, StoreError> {
        (**self).get(name)
    }

    fn get_many(&self, names: &[String]) -> Result<Vec<(String, String)>, StoreError> {
        (**self).get_many(names)
    }
}

/// Values fetched for the current invocation, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: BTreeMap<String, String>,
}

impl Parameters {
    /// Returns the value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns `true` if `name` was fetched.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// An in-process store, for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryParameterStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryParameterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    #[must_use]
    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(name.into(), value.into());
    }

    /// Removes a value.
    pub fn remove(&self, name: &str) -> Option<String> {
        self.values.write().remove(name)
    }
}

impl ParameterStore for MemoryParameterStore {
    fn get(&self, name: &str) -> Result<String, StoreError> {
        self.values
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(name))
    }
}

/// Fetches named parameters into the [`Context`] before the handler runs.
pub struct ParameterStoreDecorator {
    store: Arc<dyn ParameterStore>,
    names: Vec<String>,
}

impl ParameterStoreDecorator {
    /// Creates a decorator fetching `names` from `store`.
    pub fn new<S, I, N>(store: S, names: I) -> Self
    where
        S: ParameterStore,
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::from_shared(Arc::new(store), names)
    }

    /// Creates a decorator over an already shared store.
    pub fn from_shared<I, N>(store: Arc<dyn ParameterStore>, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            store,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the parameter names fetched per invocation.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl std::fmt::Debug for ParameterStoreDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStoreDecorator")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl Decorator for ParameterStoreDecorator {
    fn name(&self) -> &'static str {
        "parameter_store"
    }

    fn before(&self, event: Event, ctx: &mut Context) -> InvocationResult<Before> {
        let values = self.store.get_many(&self.names).map_err(|error| {
            tracing::error!(
                request_id = ctx.request_id(),
                error = %error,
                "Failed to fetch parameters"
            );
            error
        })?;

        tracing::debug!(
            request_id = ctx.request_id(),
            count = values.len(),
            "Fetched parameters"
        );
        ctx.set_extension(values.into_iter().collect::<Parameters>());
        Ok(Before::Continue(event))
    }
}
