//! Request-scoped context handed to resolvers and extension hooks.

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

/// A thread-safe, request-scoped store of values keyed by type.
///
/// One `Context` is created per inbound request (or supplied through
/// [`PipelineOptions`](crate::PipelineOptions)) and handed to field resolvers
/// and the extensions hook. Values are cloned on retrieval; wrap expensive
/// types in an `Arc` before inserting them.
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl Context {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value from the context by type, cloning it.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        let entries = self.entries.read().expect("context lock poisoned");
        entries.get(&TypeId::of::<T>()).map(|value| {
            value
                .clone()
                .downcast::<T>()
                .expect("value is keyed by its type id")
                .as_ref()
                .clone()
        })
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) {
        let mut entries = self.entries.write().expect("context lock poisoned");
        entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Removes the value of the given type, returning it if it was present.
    pub fn remove<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        let mut entries = self.entries.write().expect("context lock poisoned");
        entries.remove(&TypeId::of::<T>()).map(|value| {
            value
                .downcast::<T>()
                .expect("value is keyed by its type id")
                .as_ref()
                .clone()
        })
    }
}
