#![forbid(unsafe_code)]

//! The synchronization channel.
//!
//! One [`Channel`] exists per attachment session. Outgoing mutations queue
//! up FIFO and leave as a single batch; inbound renderer messages (edits,
//! events, scoped evaluations, diagnostics) drive the cell graph.
//!
//! # Flush gating
//!
//! `flush(Some(id))` delivers only when the queue head belongs to `id`.
//! Every cell in a mutation cascade requests a flush as its own write
//! completes, but only the cell that started the cascade — whose record is
//! first in line — actually triggers delivery. A burst of edits therefore
//! leaves as one payload, in causal order, exactly once.
//!
//! # Attachment
//!
//! `attach` walks the display tree, attaches every reachable cell with
//! flushing suppressed, then flushes once: attaching N cells costs one
//! renderer round-trip, not N.
//!
//! # Failure Modes
//!
//! Inbound failures never cross back over the boundary: unknown cell ids,
//! conversion rejects, unknown callbacks, and scoped-eval errors are logged
//! and dropped. The renderer may be slightly stale relative to a torn-down
//! cell; that is expected, not fatal.

use ahash::RandomState;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use rxbridge_core::{
    CellId, EventCallbackId, Mutation, Origin, Reactive, Registry, ScopedFnId, SyncChannel, Value,
};

use crate::codec;
use crate::config::ChannelConfig;
use crate::transport::RendererTransport;

/// The narrow interface a display tree exposes to the channel: visit every
/// reachable cell. The tree's own structure stays opaque.
pub trait CellTree {
    fn visit_cells(&self, visit: &mut dyn FnMut(&dyn Reactive));
}

impl CellTree for Vec<Rc<dyn Reactive>> {
    fn visit_cells(&self, visit: &mut dyn FnMut(&dyn Reactive)) {
        for cell in self {
            visit(cell.as_ref());
        }
    }
}

struct ChannelInner {
    registry: Registry,
    transport: Rc<dyn RendererTransport>,
    queue: RefCell<VecDeque<Mutation>>,
    config: ChannelConfig,
    delivered_assets: RefCell<HashSet<String, RandomState>>,
}

impl SyncChannel for ChannelInner {
    fn enqueue_mutation(&self, mutation: Mutation) {
        if self.config.debug {
            tracing::debug!(
                target: "rxbridge::channel",
                cell = %mutation.id,
                "mutation enqueued"
            );
        }
        self.queue.borrow_mut().push_back(mutation);
    }

    fn flush(&self, gate: Option<CellId>) {
        let batch: Vec<Mutation> = {
            let mut queue = self.queue.borrow_mut();
            if queue.is_empty() {
                return;
            }
            if let Some(id) = gate {
                if queue.front().map(|m| m.id) != Some(id) {
                    return;
                }
            }
            queue.drain(..).collect()
        };
        let payload = codec::encode_batch(&batch);
        if self.config.debug {
            tracing::debug!(
                target: "rxbridge::channel",
                records = batch.len(),
                "flushing data batch"
            );
        }
        self.transport.apply_data_batch(&payload);
    }
}

/// The per-session boundary object. Cloning shares the same queue and
/// transport.
pub struct Channel {
    inner: Rc<ChannelInner>,
}

impl Channel {
    pub fn new(registry: Registry, transport: Rc<dyn RendererTransport>) -> Self {
        Self::with_config(registry, transport, ChannelConfig::default())
    }

    pub fn with_config(
        registry: Registry,
        transport: Rc<dyn RendererTransport>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            inner: Rc::new(ChannelInner {
                registry,
                transport,
                queue: RefCell::new(VecDeque::with_capacity(config.batch_capacity)),
                config,
                delivered_assets: RefCell::new(HashSet::default()),
            }),
        }
    }

    /// This channel as the seam trait cells attach to.
    pub fn as_sync(&self) -> Rc<dyn SyncChannel> {
        self.inner.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Number of queued, not-yet-flushed mutations.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Attach every cell reachable from `root`, then flush once.
    pub fn attach(&self, root: &dyn CellTree) {
        let channel = self.as_sync();
        let mut attached = 0usize;
        root.visit_cells(&mut |cell| {
            cell.attach_channel(&channel, false);
            attached += 1;
        });
        tracing::debug!(
            target: "rxbridge::channel",
            cells = attached,
            "display tree attached"
        );
        self.inner.flush(None);
    }

    /// Detach every cell reachable from `root`.
    pub fn detach(&self, root: &dyn CellTree) {
        root.visit_cells(&mut |cell| cell.detach_channel());
    }

    /// Inbound: the renderer edited a value.
    ///
    /// Looks the cell up by id and writes with external origin, so the
    /// codec decodes the value and nothing is echoed back. Unknown ids and
    /// conversion rejects are logged and dropped.
    pub fn receive_external_edit(&self, cell_id: u64, value: Value) {
        let id = CellId::from_raw(cell_id);
        match self.inner.registry.handle(id) {
            Some(model) => {
                if let Err(err) = model.set_value(value, Origin::External) {
                    tracing::warn!(
                        target: "rxbridge::channel",
                        cell = %id,
                        %err,
                        "external edit failed"
                    );
                }
            }
            None => {
                tracing::warn!(
                    target: "rxbridge::channel",
                    cell = %id,
                    "external edit for unknown cell dropped"
                );
            }
        }
    }

    /// Inbound: the renderer fired a registered event callback.
    pub fn receive_event(&self, callback_id: u64, payload: Option<Value>) {
        let id = EventCallbackId::from_raw(callback_id);
        if let Err(err) = self.inner.registry.events().invoke(id, payload.as_ref()) {
            tracing::warn!(
                target: "rxbridge::channel",
                callback = callback_id,
                %err,
                "event dispatch failed"
            );
        }
    }

    /// Inbound: evaluate a scoped template function against
    /// placeholder-bound arguments. Errors yield `null`, never a crash.
    pub fn receive_eval_request(&self, fn_id: u64, args: &[Value]) -> Value {
        match self
            .inner
            .registry
            .eval_scoped(ScopedFnId::from_raw(fn_id), args)
        {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    target: "rxbridge::channel",
                    scoped_fn = fn_id,
                    %err,
                    "scoped evaluation failed"
                );
                Value::Null
            }
        }
    }

    /// Inbound: a renderer-side diagnostic line.
    pub fn receive_log(&self, message: &str) {
        tracing::info!(target: "rxbridge::renderer", "{message}");
    }

    /// Outbound: replace the root display tree.
    pub fn set_root(&self, tree: &Value) {
        self.inner.transport.set_root_tree(tree);
    }

    /// Outbound: re-render one component subtree.
    pub fn refresh_subtree(&self, subtree: &Value) {
        self.inner.transport.refresh_subtree(subtree);
    }

    /// Outbound: invoke a method on a rendered element.
    pub fn invoke_method(&self, target: u64, method: &str, args: &Value) {
        self.inner.transport.invoke_method(target, method, args);
    }

    /// Outbound: a diagnostic line for the renderer console.
    pub fn send_diagnostic(&self, message: &str) {
        self.inner.transport.log_diagnostic(message);
    }

    /// Record a side-channel asset as delivered. Returns `true` exactly
    /// once per key; callers ship the asset only on `true`, so static
    /// resources are never re-sent within a session.
    pub fn register_asset(&self, key: &str) -> bool {
        self.inner
            .delivered_assets
            .borrow_mut()
            .insert(key.to_string())
    }
}

impl SyncChannel for Channel {
    fn enqueue_mutation(&self, mutation: Mutation) {
        self.inner.enqueue_mutation(mutation);
    }

    fn flush(&self, gate: Option<CellId>) {
        self.inner.flush(gate);
    }
}

impl Clone for Channel {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("pending", &self.pending())
            .field("debug", &self.inner.config.debug)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
