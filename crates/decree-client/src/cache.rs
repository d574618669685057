//! Result memoization and entity normalization.
//!
//! Two stores with different grains:
//!
//! - [`DocumentCache`] memoizes whole decoded results per [`CacheKey`]
//!   (operation name + canonical variables), serving repeat executions
//!   without a round trip.
//! - [`NormalizedCache`] accumulates per-entity snapshots keyed by
//!   `(typename, id)`, merged from every successful response whose data
//!   identifies its objects. It is an explicitly constructed, explicitly
//!   scoped object handed to the client at build time; there is no hidden
//!   process-wide singleton.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use decree_schema::Operation;

/// Deterministic identifier for one execution: operation name plus the
/// canonical JSON encoding of its variables.
///
/// Canonical because `serde_json` object keys are ordered, so two
/// executions with the same variables produce byte-identical keys
/// regardless of field construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: &'static str,
    variables: String,
}

impl CacheKey {
    pub fn new(operation: &'static str, variables: &Value) -> Self {
        Self {
            operation,
            variables: variables.to_string(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operation, self.variables)
    }
}

/// Memoized decoded results, one entry per cache key.
///
/// Values are stored type-erased; the operation name inside the key pins
/// the concrete type, so a downcast on read cannot miss for a key built
/// from the same operation.
#[derive(Default)]
pub struct DocumentCache {
    entries: Mutex<HashMap<CacheKey, Box<dyn Any + Send + Sync>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Op: Operation>(&self, key: &CacheKey) -> Option<Arc<Op::Data>> {
        self.entries
            .lock()
            .get(key)
            .and_then(|entry| entry.downcast_ref::<Arc<Op::Data>>())
            .cloned()
    }

    pub fn insert<Op: Operation>(&self, key: CacheKey, data: Arc<Op::Data>) {
        self.entries.lock().insert(key, Box::new(data));
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Key of one normalized entity: type name merged with identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub typename: String,
    pub id: String,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.typename, self.id)
    }
}

/// Store of the latest known scalar fields per entity.
///
/// Entities are recognized in response data by the presence of string
/// `__typename` and `id` fields; documents that do not select those simply
/// contribute nothing. Merges are atomic per response: a reader never
/// observes half of one response's entities.
///
/// Cloning shares the underlying store, so one cache can back several
/// clients.
#[derive(Clone, Default)]
pub struct NormalizedCache {
    entities: Arc<RwLock<HashMap<EntityKey, Map<String, Value>>>>,
}

impl NormalizedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every identifiable entity in `data` into the store.
    ///
    /// Scalar fields overwrite previous values; fields not present in
    /// `data` keep their last known value. The whole response is applied
    /// under one write lock.
    pub fn merge_response(&self, data: &Value) {
        let mut records = Vec::new();
        collect_entities(data, &mut records);
        if records.is_empty() {
            return;
        }

        let count = records.len();
        let mut entities = self.entities.write();
        for (key, fields) in records {
            entities.entry(key).or_default().extend(fields);
        }
        drop(entities);
        tracing::debug!(
            target: "decree_client::cache",
            "merged {count} entity record(s) into the normalized cache"
        );
    }

    /// The latest known fields of one entity.
    pub fn entity(&self, typename: &str, id: &str) -> Option<Map<String, Value>> {
        let key = EntityKey {
            typename: typename.to_owned(),
            id: id.to_owned(),
        };
        self.entities.read().get(&key).cloned()
    }

    /// One field of one entity, without a round trip.
    pub fn field(&self, typename: &str, id: &str, name: &str) -> Option<Value> {
        let key = EntityKey {
            typename: typename.to_owned(),
            id: id.to_owned(),
        };
        self.entities.read().get(&key)?.get(name).cloned()
    }

    pub fn clear(&self) {
        self.entities.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl fmt::Debug for NormalizedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedCache")
            .field("entities", &self.len())
            .finish()
    }
}

/// Walk a data tree and record the scalar fields of every object carrying
/// string `__typename` and `id` fields.
fn collect_entities(value: &Value, records: &mut Vec<(EntityKey, Map<String, Value>)>) {
    match value {
        Value::Object(object) => {
            if let (Some(Value::String(typename)), Some(Value::String(id))) =
                (object.get("__typename"), object.get("id"))
            {
                let fields: Map<String, Value> = object
                    .iter()
                    .filter(|(name, field)| {
                        *name != "__typename" && !matches!(field, Value::Object(_) | Value::Array(_))
                    })
                    .map(|(name, field)| (name.clone(), field.clone()))
                    .collect();
                records.push((
                    EntityKey {
                        typename: typename.clone(),
                        id: id.clone(),
                    },
                    fields,
                ));
            }
            for field in object.values() {
                collect_entities(field, records);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_entities(item, records);
            }
        }
        _ => {}
    }
}
