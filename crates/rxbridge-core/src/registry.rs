#![forbid(unsafe_code)]

//! The cell registry: an id-keyed arena of live cell state.
//!
//! The registry is explicit, injected state — cells are created *against* a
//! registry handle, never through process-wide globals. It owns three
//! disjoint integer id namespaces: cell ids, placeholder-variable ids, and
//! scoped-function ids (event-callback ids live in [`crate::events`], also
//! disjoint). Disjointness lets wire records disambiguate "live data
//! reference" from "template-scope reference" without out-of-band context.
//!
//! # Reference counting
//!
//! Every [`Model`](crate::Model) handle of an id — the creating handle, each
//! `view()`, each `Clone` — holds one count. Drop releases it; the id is
//! evicted when the count reaches zero. Ids are monotonically allocated and
//! never reused, so a stale id received from the renderer after teardown is
//! detectably unknown rather than silently rebound.
//!
//! # Concurrency
//!
//! Single logical thread of control per session; no locking. A genuinely
//! multi-threaded host would need a mutex around the registry and the
//! channel queue, and must keep batch flush atomic under contention.

use ahash::RandomState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::Value;
use crate::error::{ComputeError, StateError};
use crate::events::EventCallbacks;
use crate::model::{Codec, Model};
use crate::sync::SyncChannel;

/// Identity of a mutable cell. Unique for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u64);

impl CellId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a placeholder variable (template scope). Disjoint from cell ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropVarId(u64);

impl PropVarId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PropVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a scoped template function. Disjoint from the other namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopedFnId(u64);

impl ScopedFnId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopedFnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered local subscriber. `immediate` subscribers additionally run
/// once when a channel is first attached.
#[derive(Clone)]
pub(crate) struct Subscriber {
    pub(crate) callback: Rc<dyn Fn(&Value)>,
    pub(crate) immediate: bool,
}

/// Canonical per-id state shared by every handle of the id.
pub(crate) struct CellState {
    pub(crate) value: Value,
    pub(crate) codec: Codec,
    pub(crate) modifiers: Vec<String>,
    pub(crate) subscribers: Vec<Subscriber>,
    pub(crate) channel: Option<Rc<dyn SyncChannel>>,
}

struct Entry {
    state: Rc<RefCell<CellState>>,
    handles: usize,
}

type ScopedFn = dyn Fn(&[Value]) -> Result<Value, ComputeError>;

struct RegistryInner {
    cells: HashMap<CellId, Entry, RandomState>,
    scoped: HashMap<ScopedFnId, Rc<ScopedFn>, RandomState>,
    next_cell: u64,
    next_prop: u64,
    next_scoped: u64,
}

/// Shared handle to the cell table. Cloning is cheap and refers to the same
/// underlying registry.
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RefCell<RegistryInner>>,
    events: EventCallbacks,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                cells: HashMap::default(),
                scoped: HashMap::default(),
                next_cell: 1,
                next_prop: 1,
                next_scoped: 1,
            })),
            events: EventCallbacks::new(),
        }
    }

    /// The registry's event-callback table.
    pub fn events(&self) -> &EventCallbacks {
        &self.events
    }

    /// Allocate a fresh cell id and install its state with one handle.
    pub(crate) fn create_cell(&self, value: Value, codec: Codec) -> CellId {
        let mut inner = self.inner.borrow_mut();
        let id = CellId(inner.next_cell);
        inner.next_cell += 1;
        inner.cells.insert(
            id,
            Entry {
                state: Rc::new(RefCell::new(CellState {
                    value,
                    codec,
                    modifiers: Vec::new(),
                    subscribers: Vec::new(),
                    channel: None,
                })),
                handles: 1,
            },
        );
        tracing::trace!(target: "rxbridge::registry", cell = %id, "cell created");
        id
    }

    pub(crate) fn acquire(&self, id: CellId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(entry) = inner.cells.get_mut(&id) {
            entry.handles += 1;
        }
    }

    pub(crate) fn release(&self, id: CellId) {
        let mut inner = self.inner.borrow_mut();
        let evict = match inner.cells.get_mut(&id) {
            Some(entry) => {
                entry.handles = entry.handles.saturating_sub(1);
                entry.handles == 0
            }
            None => false,
        };
        if evict {
            inner.cells.remove(&id);
            tracing::trace!(target: "rxbridge::registry", cell = %id, "cell evicted");
        }
    }

    pub(crate) fn state(&self, id: CellId) -> Option<Rc<RefCell<CellState>>> {
        self.inner.borrow().cells.get(&id).map(|e| e.state.clone())
    }

    /// Whether `id` is currently live (some handle still holds it).
    pub fn contains(&self, id: CellId) -> bool {
        self.inner.borrow().cells.contains_key(&id)
    }

    /// Number of live cell ids.
    pub fn len(&self) -> usize {
        self.inner.borrow().cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().cells.is_empty()
    }

    /// Resurrect an owner handle (empty path) for a live id.
    ///
    /// This is how inbound renderer edits reach the graph; `None` means the
    /// cell was already torn down and the edit should be dropped with a log
    /// line, not an error surfaced to the renderer.
    pub fn handle(&self, id: CellId) -> Option<Model> {
        if !self.contains(id) {
            return None;
        }
        self.acquire(id);
        Some(Model::from_registry(self.clone(), id))
    }

    pub(crate) fn alloc_prop_var(&self) -> PropVarId {
        let mut inner = self.inner.borrow_mut();
        let id = PropVarId(inner.next_prop);
        inner.next_prop += 1;
        id
    }

    /// Register a scoped template function, callable from the renderer with
    /// placeholder-bound arguments.
    pub fn register_scoped(
        &self,
        func: impl Fn(&[Value]) -> Result<Value, ComputeError> + 'static,
    ) -> ScopedFnId {
        let mut inner = self.inner.borrow_mut();
        let id = ScopedFnId(inner.next_scoped);
        inner.next_scoped += 1;
        inner.scoped.insert(id, Rc::new(func));
        id
    }

    /// Evaluate a scoped function against an externally supplied argument
    /// tuple. Bypasses any cell read; this is the renderer's iteration/slot
    /// expansion path.
    pub fn eval_scoped(&self, id: ScopedFnId, args: &[Value]) -> Result<Value, StateError> {
        let func = self
            .inner
            .borrow()
            .scoped
            .get(&id)
            .cloned()
            .ok_or(StateError::UnknownScopedFn { id: id.raw() })?;
        func(args).map_err(StateError::from)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Registry")
            .field("cells", &inner.cells.len())
            .field("scoped_fns", &inner.scoped.len())
            .field("next_cell", &inner.next_cell)
            .finish()
    }
}
