#![forbid(unsafe_code)]

//! Derived cells.
//!
//! A [`Computed`] is a pure function over one or more dependency cells
//! (mutable or derived). It owns an internal storage [`Model`] holding the
//! last-computed value; recomputation assigns through the storage cell's
//! normal `set_value` path, so downstream subscribers and channel
//! propagation come for free. To everything else a computed *is* a cell:
//! same read/subscribe/serialize contract.
//!
//! # Invariants
//!
//! 1. The value is always the function applied to the dependencies' current
//!    values: recomputation runs synchronously inside each dependency's
//!    change notification, before control returns to the mutator.
//! 2. A failed computation is logged, keeps the prior value, and propagates
//!    no change notification downstream (no write happened).
//! 3. Dependency values are gathered in declared argument order.
//!
//! Dependency cycles are a programmer error: a cycle recurses until the
//! stack runs out. The engine does not detect them.
//!
//! # Failure Modes
//!
//! - Function returns `Err`: logged with the storage cell id, prior value
//!   retained; the dependency's other subscribers still run.
//! - Computed dropped while dependencies live: the recompute subscriptions
//!   hold only a weak reference and become inert.

use std::fmt;
use std::rc::Rc;

use crate::Value;
use crate::error::{ComputeError, PathError};
use crate::model::Model;
use crate::reactive::Reactive;
use crate::registry::{CellId, Registry};
use crate::sync::SyncChannel;

struct ComputedInner {
    func: Box<dyn Fn(&[Value]) -> Result<Value, ComputeError>>,
    deps: Vec<Rc<dyn Reactive>>,
    storage: Model,
}

/// A derived cell. Cloning shares the same inner state.
pub struct Computed {
    inner: Rc<ComputedInner>,
}

impl Computed {
    /// Create a derived cell over `deps`, computing eagerly once and
    /// recomputing whenever any dependency notifies a change.
    ///
    /// `func` receives the dependencies' current values in declared order.
    /// Placeholder variables cannot appear here: they do not implement
    /// [`Reactive`]. Use [`ScopedComputed`](crate::ScopedComputed) for
    /// template-scoped functions.
    pub fn new(
        registry: &Registry,
        func: impl Fn(&[Value]) -> Result<Value, ComputeError> + 'static,
        deps: &[&dyn Reactive],
    ) -> Self {
        let inner = Rc::new(ComputedInner {
            func: Box::new(func),
            deps: deps.iter().map(|d| d.to_shared()).collect(),
            storage: Model::new(registry, Value::Null),
        });

        recompute(&inner);

        for dep in &inner.deps {
            let weak = Rc::downgrade(&inner);
            dep.subscribe(
                Rc::new(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        recompute(&inner);
                    }
                }),
                false,
            );
        }

        Self { inner }
    }

    /// The storage cell's id (this is the id wire records carry).
    pub fn id(&self) -> CellId {
        self.inner.storage.id()
    }

    /// Last-computed value.
    pub fn value(&self) -> Result<Value, PathError> {
        self.inner.storage.value()
    }

    /// Register a change subscriber on the storage cell.
    pub fn add_callback(&self, callback: impl Fn(&Value) + 'static, immediate: bool) {
        self.inner.storage.subscribe(Rc::new(callback), immediate);
    }
}

/// Gather dependency values in order, apply the function, and assign the
/// result through the storage cell. Both failure branches keep the prior
/// value and notify nobody.
fn recompute(inner: &ComputedInner) {
    let mut values = Vec::with_capacity(inner.deps.len());
    for dep in &inner.deps {
        match dep.value() {
            Ok(v) => values.push(v),
            Err(err) => {
                tracing::warn!(
                    target: "rxbridge::computed",
                    cell = %inner.storage.id(),
                    %err,
                    "dependency read failed; keeping previous value"
                );
                return;
            }
        }
    }
    match (inner.func)(&values) {
        Ok(value) => {
            inner
                .storage
                .set(value)
                .expect("storage cell has an empty path");
        }
        Err(err) => {
            tracing::warn!(
                target: "rxbridge::computed",
                cell = %inner.storage.id(),
                deps = inner.deps.len(),
                %err,
                "recomputation failed; keeping previous value"
            );
        }
    }
}

impl Reactive for Computed {
    fn cell_id(&self) -> CellId {
        self.inner.storage.id()
    }

    fn value(&self) -> Result<Value, PathError> {
        self.inner.storage.value()
    }

    fn render_as_data(&self) -> Value {
        self.inner.storage.render_as_data()
    }

    fn subscribe(&self, callback: Rc<dyn Fn(&Value)>, immediate: bool) {
        self.inner.storage.subscribe(callback, immediate);
    }

    fn attach_channel(&self, channel: &Rc<dyn SyncChannel>, flush: bool) {
        self.inner.storage.attach_channel(channel, flush);
    }

    fn detach_channel(&self) {
        self.inner.storage.detach_channel();
    }

    fn to_shared(&self) -> Rc<dyn Reactive> {
        Rc::new(self.clone())
    }
}

impl Clone for Computed {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.storage.id())
            .field("deps", &self.inner.deps.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
