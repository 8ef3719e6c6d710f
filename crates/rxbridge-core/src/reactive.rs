#![forbid(unsafe_code)]

//! The capability shared by live cells.
//!
//! [`Reactive`] is the read/subscribe/serialize contract: everything the
//! channel, the codec, and the display-tree layer need from a cell, without
//! caring whether it is mutable ([`Model`](crate::Model)) or derived
//! ([`Computed`](crate::Computed)). Writes stay on `Model` — derived cells
//! are read-only from the outside.
//!
//! [`PropVar`](crate::PropVar) deliberately does **not** implement this
//! trait: a placeholder has no independently resolvable value, so using one
//! where a live cell is required fails at compile time instead of at render
//! time.

use std::rc::Rc;

use crate::Value;
use crate::error::PathError;
use crate::registry::CellId;
use crate::sync::SyncChannel;

pub trait Reactive {
    /// The cell id this handle reads through (a computed's storage id).
    fn cell_id(&self) -> CellId;

    /// Current resolved value.
    fn value(&self) -> Result<Value, PathError>;

    /// Wire snapshot of this cell (`{"@": id, ...}` record).
    fn render_as_data(&self) -> Value;

    /// Register a change subscriber. `immediate` subscribers also run once
    /// when a channel is first attached.
    fn subscribe(&self, callback: Rc<dyn Fn(&Value)>, immediate: bool);

    /// Attach a synchronization channel, enqueueing the current snapshot.
    /// Idempotent for an already-attached channel.
    fn attach_channel(&self, channel: &Rc<dyn SyncChannel>, flush: bool);

    /// Detach any attached channel.
    fn detach_channel(&self);

    /// A shared, clonable handle to the same cell (for dependency lists).
    fn to_shared(&self) -> Rc<dyn Reactive>;
}
