//! Registry of class handlers
//!
//! Handlers are built on first use and cached for the lifetime of the
//! registry. Custom field handlers must be registered before the handler of
//! their record type is built.

use crate::class_handler::ClassHandler;
use crate::errors::{DbError, DbResult};
use crate::field::FieldHandler;
use crate::traits::Record;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

type Overrides = HashMap<String, Arc<dyn FieldHandler>>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    overrides: RwLock<HashMap<TypeId, Overrides>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached handler for `T`, built on first use
    pub fn handler_for<T: Record>(&self) -> DbResult<Arc<ClassHandler<T>>> {
        let type_id = TypeId::of::<T>();

        if let Some(handler) = self.cached::<T>(type_id) {
            return Ok(handler);
        }

        // Built under the write lock so a registration cannot slip in between
        // reading the overrides and caching the handler
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = handlers.get(&type_id) {
            return downcast::<T>(existing.clone());
        }

        let overrides = self
            .overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
            .unwrap_or_default();
        let built: Arc<dyn Any + Send + Sync> = Arc::new(ClassHandler::<T>::build(&overrides)?);
        debug!(table = T::table_name(), "registered class handler");
        let entry = handlers.entry(type_id).or_insert(built);
        downcast::<T>(entry.clone())
    }

    fn cached<T: Record>(&self, type_id: TypeId) -> Option<Arc<ClassHandler<T>>> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .get(&type_id)
            .and_then(|handler| downcast::<T>(handler.clone()).ok())
    }

    /// True once the handler for `T` has been built
    pub fn is_built<T: Record>(&self) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    /// Use `handler` for `field` of `T` instead of the declared or default handler
    pub fn register_field_handler<T: Record>(
        &self,
        field: &str,
        handler: Arc<dyn FieldHandler>,
    ) -> DbResult<()> {
        let record = std::any::type_name::<T>();

        // Held until the override is stored, see `handler_for`
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&TypeId::of::<T>()) {
            return Err(DbError::Configuration(format!(
                "cannot register a handler for {}.{}: the class handler is already in use",
                record, field
            )));
        }

        if !T::field_bindings().iter().any(|b| b.name == field) {
            return Err(DbError::Configuration(format!(
                "{} has no persisted field named '{}'",
                record, field
            )));
        }

        self.overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<T>())
            .or_default()
            .insert(field.to_string(), handler);
        drop(handlers);
        Ok(())
    }
}

fn downcast<T: Record>(handler: Arc<dyn Any + Send + Sync>) -> DbResult<Arc<ClassHandler<T>>> {
    handler.downcast::<ClassHandler<T>>().map_err(|_| {
        DbError::Configuration(format!(
            "cached handler has the wrong type for {}",
            std::any::type_name::<T>()
        ))
    })
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &count)
            .finish()
    }
}
