//! Cross-reference tables.
//!
//! [`XRefRegistry`] is the write-side numbering of objects being built;
//! [`XRefTable`] is the read-side index from object numbers to byte offsets
//! with a lazily filled per-entry cache. Both sides agree that object 0 is
//! the head of the free list and never holds a value.

mod registry;
mod table;

pub use registry::XRefRegistry;
pub use table::{XRefEntry, XRefTable};

use std::collections::HashMap;

use crate::error::{PdfError, Result};
use crate::objects::{ObjectId, Value};

/// Longest reference chain followed by the default `resolve`.
const DEFAULT_CHAIN_LIMIT: usize = 32;

/// Anything that can dereference indirect objects.
pub trait ObjectResolver {
    /// The value stored under `id`. Unknown and free entries are
    /// `MalformedDocument`.
    fn get_object(&self, id: ObjectId) -> Result<&Value>;

    /// Returns direct values unchanged and follows references otherwise.
    fn resolve<'a>(&'a self, value: &'a Value) -> Result<&'a Value> {
        let mut current = value;
        for _ in 0..DEFAULT_CHAIN_LIMIT {
            match current {
                Value::Reference(id) => current = self.get_object(*id)?,
                other => return Ok(other),
            }
        }
        Err(PdfError::malformed("reference chain too long"))
    }

    /// Like [`resolve`](Self::resolve) but substitutes `null` for anything
    /// that fails to resolve, logging the failure.
    fn resolve_or_null<'a>(&'a self, value: &'a Value) -> &'a Value {
        match self.resolve(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("substituting null: {e}");
                &NULL
            }
        }
    }
}

static NULL: Value = Value::Null;

/// A resolver over objects already held in memory; used for documents
/// assembled by hand and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    objects: HashMap<ObjectId, Value>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ObjectId, value: impl Into<Value>) {
        self.objects.insert(id, value.into());
    }

    /// Stores `value` under the next free object number.
    pub fn add(&mut self, value: impl Into<Value>) -> ObjectId {
        let next = self.objects.keys().map(|id| id.number()).max().unwrap_or(0) + 1;
        let id = ObjectId::new(next, 0);
        self.insert(id, value);
        id
    }
}

impl ObjectResolver for MemoryResolver {
    fn get_object(&self, id: ObjectId) -> Result<&Value> {
        self.objects
            .get(&id)
            .ok_or_else(|| PdfError::malformed(format!("no object {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_resolver_follows_chain() {
        let mut objects = MemoryResolver::new();
        let target = objects.add(42);
        let hop = objects.add(Value::Reference(target));

        let start = Value::Reference(hop);
        let resolved = objects.resolve(&start).unwrap();
        assert_eq!(resolved, &Value::Number(42.0));

        let direct = Value::name("Direct");
        assert_eq!(objects.resolve(&direct).unwrap(), &direct);
    }

    #[test]
    fn test_missing_object_is_malformed() {
        let objects = MemoryResolver::new();
        let err = objects
            .resolve(&Value::Reference(ObjectId::new(9, 0)))
            .unwrap_err();
        assert!(matches!(err, PdfError::MalformedDocument(_)));
        assert!(objects
            .resolve_or_null(&Value::Reference(ObjectId::new(9, 0)))
            .is_null());
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let mut objects = MemoryResolver::new();
        let id = ObjectId::new(1, 0);
        objects.insert(id, Value::Reference(id));
        assert!(objects.resolve(&Value::Reference(id)).is_err());
    }
}
