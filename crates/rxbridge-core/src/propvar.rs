#![forbid(unsafe_code)]

//! Template-scoped placeholders and scoped functions.
//!
//! Inside repeated or slot-projected rendering contexts the renderer binds
//! variables that have no backing cell on this side — the loop item, the
//! slot payload. A [`PropVar`] names such a variable: it composes paths
//! like a cell, serializes as a `@p` record, and nothing more. It cannot be
//! read, written, or subscribed; it does not implement
//! [`Reactive`](crate::Reactive), so passing one where a live cell is
//! required is a type error.
//!
//! A [`ScopedComputed`] is the derived-value counterpart: a function whose
//! arguments are placeholder-bound at render time. It never supports a
//! synchronous `value` read — the renderer evaluates it through the
//! channel's eval request, which calls the registered function directly
//! with the supplied argument tuple.

use crate::Value;
use crate::error::ComputeError;
use crate::path::{self, Path, PathSeg};
use crate::registry::{PropVarId, Registry, ScopedFnId};

/// A placeholder variable scoped to a template context.
#[derive(Debug, Clone)]
pub struct PropVar {
    id: PropVarId,
    path: Path,
}

impl PropVar {
    pub fn new(registry: &Registry) -> Self {
        Self {
            id: registry.alloc_prop_var(),
            path: Path::new(),
        }
    }

    pub fn id(&self) -> PropVarId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The generated scope-variable name the renderer binds.
    pub fn name(&self) -> String {
        format!("prop_{}", self.id.raw())
    }

    /// Compose a deeper path into the bound value.
    pub fn view(&self, segment: impl Into<PathSeg>) -> PropVar {
        let mut path = self.path.clone();
        path.push(segment.into());
        PropVar { id: self.id, path }
    }

    /// Wire record: `{"@p": name, "path": [...]}`.
    pub fn render_as_data(&self) -> Value {
        let mut record = serde_json::Map::new();
        record.insert("@p".into(), Value::String(self.name()));
        record.insert("path".into(), path::to_wire(&self.path));
        Value::Object(record)
    }
}

/// A derived-value function over placeholder arguments, registered for
/// renderer-driven evaluation.
pub struct ScopedComputed {
    registry: Registry,
    id: ScopedFnId,
    args: Vec<PropVar>,
}

impl ScopedComputed {
    pub fn new(
        registry: &Registry,
        func: impl Fn(&[Value]) -> Result<Value, ComputeError> + 'static,
        args: &[PropVar],
    ) -> Self {
        Self {
            registry: registry.clone(),
            id: registry.register_scoped(func),
            args: args.to_vec(),
        }
    }

    pub fn id(&self) -> ScopedFnId {
        self.id
    }

    pub fn args(&self) -> &[PropVar] {
        &self.args
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Wire record: `{"@fn": id, "args": [placeholder records...]}`.
    pub fn render_as_data(&self) -> Value {
        let mut record = serde_json::Map::new();
        record.insert("@fn".into(), Value::from(self.id.raw()));
        record.insert(
            "args".into(),
            Value::Array(self.args.iter().map(PropVar::render_as_data).collect()),
        );
        Value::Object(record)
    }
}

impl std::fmt::Debug for ScopedComputed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedComputed")
            .field("id", &self.id)
            .field("args", &self.args.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prop_var_ids_and_names() {
        let registry = Registry::new();
        let a = PropVar::new(&registry);
        let b = PropVar::new(&registry);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), format!("prop_{}", a.id().raw()));
    }

    #[test]
    fn path_composition() {
        let registry = Registry::new();
        let row = PropVar::new(&registry);
        let cellar = row.view("cells").view(2usize);

        assert_eq!(cellar.id(), row.id());
        assert_eq!(
            cellar.render_as_data(),
            json!({"@p": row.name(), "path": ["cells", 2]})
        );
        // The original is untouched.
        assert!(row.path().is_empty());
    }

    #[test]
    fn scoped_computed_round_trip_through_registry() {
        let registry = Registry::new();
        let item = PropVar::new(&registry);
        let shout = ScopedComputed::new(
            &registry,
            |args| {
                let s = args[0].as_str().unwrap_or_default();
                Ok(json!(s.to_uppercase()))
            },
            &[item.clone()],
        );

        let record = shout.render_as_data();
        assert_eq!(record["@fn"], json!(shout.id().raw()));
        assert_eq!(record["args"][0]["@p"], json!(item.name()));

        let out = registry
            .eval_scoped(shout.id(), &[json!("hello")])
            .unwrap();
        assert_eq!(out, json!("HELLO"));
    }
}
