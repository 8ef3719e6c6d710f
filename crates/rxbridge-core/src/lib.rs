#![forbid(unsafe_code)]

//! Reactive cell graph for rxbridge.
//!
//! This crate is the backend half of the binding layer: a graph of mutable
//! cells ([`Model`]), derived cells ([`Computed`]), and template placeholders
//! ([`PropVar`]), all owned by an explicit [`Registry`]. Cells expose read,
//! write, and subscribe operations; mutations propagate synchronously through
//! subscriber callbacks and, when a synchronization channel is attached,
//! are queued for batched delivery to the external renderer.
//!
//! # Architecture
//!
//! Cell state lives in the registry, keyed by integer id. A [`Model`] is a
//! cheap handle `{id, path}`; every handle of the same id funnels reads and
//! writes through one canonical stored value and one subscriber list, so a
//! mutation through any path view is visible to all other views. Handle
//! counts are explicit: `view()` and `Clone` acquire, `Drop` releases, and
//! the id is evicted when the last handle goes away.
//!
//! The channel itself lives in `rxbridge-wire`; this crate only sees the
//! narrow [`SyncChannel`] seam.
//!
//! # Invariants
//!
//! 1. Subscriber callbacks for a given cell fire in registration order.
//! 2. A recomputation cascade completes fully before control returns to the
//!    original mutator.
//! 3. Setting a value deep-equal to the current value is a no-op: nothing is
//!    enqueued and no callbacks fire.
//! 4. Cell ids are never reused while any handle is alive.

pub mod computed;
pub mod error;
pub mod events;
pub mod model;
pub mod path;
pub mod propvar;
pub mod reactive;
pub mod registry;
pub mod sync;

pub use computed::Computed;
pub use error::{ComputeError, ConvertError, EventError, PathError, StateError};
pub use events::{EventCallbackId, EventCallbacks};
pub use model::{Codec, Model, Origin};
pub use path::{Path, PathSeg};
pub use propvar::{PropVar, ScopedComputed};
pub use reactive::Reactive;
pub use registry::{CellId, PropVarId, Registry, ScopedFnId};
pub use sync::{Mutation, SyncChannel};

/// Wire value type. Everything a cell stores or ships is JSON-representable.
pub use serde_json::Value;
