#![forbid(unsafe_code)]

//! The seam between cells and the synchronization channel.
//!
//! Cells never see the renderer transport; they talk to a [`SyncChannel`],
//! which queues outgoing mutation records and decides when a flush actually
//! reaches the renderer. The concrete channel lives in `rxbridge-wire`;
//! keeping the trait here fixes the dependency direction (wire depends on
//! core, never the reverse).

use crate::Value;
use crate::path::Path;
use crate::registry::CellId;

/// One outgoing mutation record: "the value at `path` inside cell `id`
/// changed to `value`" (already in wire form).
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub id: CellId,
    pub path: Path,
    pub value: Value,
}

/// Capability a cell needs from the channel: enqueue and (gated) flush.
///
/// `flush(Some(id))` only delivers when the head of the pending queue
/// belongs to `id`; this lets every link in a mutation cascade request a
/// flush while the batch is still delivered exactly once, by the cell that
/// started the cascade.
pub trait SyncChannel {
    fn enqueue_mutation(&self, mutation: Mutation);
    fn flush(&self, gate: Option<CellId>);
}
