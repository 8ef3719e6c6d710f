#![forbid(unsafe_code)]

//! The outbound renderer transport.
//!
//! [`RendererTransport`] is the complete vocabulary the binding layer
//! speaks to the view host: set the root display tree, apply a data batch,
//! refresh a subtree after structural changes, invoke a method on a
//! rendered element, and emit a diagnostic line. Delivery is
//! fire-and-forget; transport-level failures are the host's concern.
//!
//! Two stock implementations ship here: [`NullTransport`] discards
//! everything (headless operation), and [`RecordingTransport`] accumulates
//! calls for inspection — the test double for everything downstream.

use rxbridge_core::Value;
use std::cell::RefCell;

/// The renderer-facing verbs. Implementations wrap the host's evaluate-JS
/// bridge, message bus, or whatever actually reaches the view.
pub trait RendererTransport {
    /// Replace the entire display tree with `tree`.
    fn set_root_tree(&self, tree: &Value);

    /// Apply an ordered batch of data mutation records.
    fn apply_data_batch(&self, batch: &Value);

    /// Re-render one component subtree after a structural children change.
    fn refresh_subtree(&self, subtree: &Value);

    /// Invoke a method on a rendered element (imperative calls such as
    /// validation triggers).
    fn invoke_method(&self, target: u64, method: &str, args: &Value);

    /// Emit a diagnostic line on the renderer side.
    fn log_diagnostic(&self, message: &str);
}

/// Discards every call. Useful for headless runs and benches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl RendererTransport for NullTransport {
    fn set_root_tree(&self, _tree: &Value) {}
    fn apply_data_batch(&self, _batch: &Value) {}
    fn refresh_subtree(&self, _subtree: &Value) {}
    fn invoke_method(&self, _target: u64, _method: &str, _args: &Value) {}
    fn log_diagnostic(&self, _message: &str) {}
}

/// One recorded transport call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    SetRootTree(Value),
    ApplyDataBatch(Value),
    RefreshSubtree(Value),
    InvokeMethod {
        target: u64,
        method: String,
        args: Value,
    },
    LogDiagnostic(String),
}

/// Records every call for later inspection.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: RefCell<Vec<TransportCall>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.borrow().clone()
    }

    /// Only the data batches, in order.
    pub fn batches(&self) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                TransportCall::ApplyDataBatch(batch) => Some(batch.clone()),
                _ => None,
            })
            .collect()
    }

    /// Drain and return all recorded calls.
    pub fn take_calls(&self) -> Vec<TransportCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }
}

impl RendererTransport for RecordingTransport {
    fn set_root_tree(&self, tree: &Value) {
        self.calls
            .borrow_mut()
            .push(TransportCall::SetRootTree(tree.clone()));
    }

    fn apply_data_batch(&self, batch: &Value) {
        self.calls
            .borrow_mut()
            .push(TransportCall::ApplyDataBatch(batch.clone()));
    }

    fn refresh_subtree(&self, subtree: &Value) {
        self.calls
            .borrow_mut()
            .push(TransportCall::RefreshSubtree(subtree.clone()));
    }

    fn invoke_method(&self, target: u64, method: &str, args: &Value) {
        self.calls.borrow_mut().push(TransportCall::InvokeMethod {
            target,
            method: method.to_string(),
            args: args.clone(),
        });
    }

    fn log_diagnostic(&self, message: &str) {
        self.calls
            .borrow_mut()
            .push(TransportCall::LogDiagnostic(message.to_string()));
    }
}
