#![forbid(unsafe_code)]

//! The mutable cell.
//!
//! A [`Model`] is a lightweight handle `{id, path}` into registry-owned
//! state. The empty path means the handle owns the raw value; a non-empty
//! path means the handle is a view into the owning cell's structure. All
//! handles of one id share a single stored value, codec, modifier set, and
//! subscriber list, so a write through any view is visible everywhere.
//!
//! # Write pipeline
//!
//! `set_value` short-circuits on deep-equal values, decodes external input
//! through the cell's [`Codec`] (containing failures), writes at the
//! resolved location, enqueues a wire mutation on the attached channel for
//! local writes, fires subscribers in registration order, and finally
//! requests a head-gated flush. External writes never re-enqueue: the
//! renderer already has the value.
//!
//! # Failure Modes
//!
//! - Inbound conversion failure: logged, stored value unchanged, `Ok`.
//! - Path lookup/write failure: returned to the caller as [`PathError`] —
//!   a bad path is a programmer or template error, not a data condition.

use std::fmt;
use std::rc::Rc;

use crate::Value;
use crate::error::{ConvertError, PathError};
use crate::path::{self, Path, PathSeg};
use crate::reactive::Reactive;
use crate::registry::{CellId, Registry, Subscriber};
use crate::sync::{Mutation, SyncChannel};

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Paired inbound-decode / outbound-encode conversion for one cell id.
///
/// Codecs are explicit at creation time and never inferred from the initial
/// value. The default is identity; the stock constructors coerce the loose
/// string/number forms a renderer input widget produces.
#[derive(Clone)]
pub struct Codec {
    decode: Rc<dyn Fn(&Value) -> Result<Value, ConvertError>>,
    encode: Rc<dyn Fn(&Value) -> Value>,
}

impl Codec {
    pub fn new(
        decode: impl Fn(&Value) -> Result<Value, ConvertError> + 'static,
        encode: impl Fn(&Value) -> Value + 'static,
    ) -> Self {
        Self {
            decode: Rc::new(decode),
            encode: Rc::new(encode),
        }
    }

    /// No conversion in either direction.
    pub fn identity() -> Self {
        Self::new(|v| Ok(v.clone()), Value::clone)
    }

    /// Coerce inbound values to an integer: integral numbers, numeric
    /// strings, and booleans pass; everything else is a conversion error.
    pub fn integer() -> Self {
        Self::new(
            |v| match v {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(v.clone()),
                Value::Number(n) => {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if f.fract() == 0.0 {
                        Ok(Value::from(f as i64))
                    } else {
                        Err(ConvertError::new("integer", v))
                    }
                }
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| ConvertError::new("integer", v)),
                Value::Bool(b) => Ok(Value::from(i64::from(*b))),
                _ => Err(ConvertError::new("integer", v)),
            },
            Value::clone,
        )
    }

    /// Coerce inbound values to a float: numbers and numeric strings pass.
    pub fn float() -> Self {
        Self::new(
            |v| match v {
                Value::Number(_) => Ok(v.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
                    .ok_or_else(|| ConvertError::new("float", v)),
                _ => Err(ConvertError::new("float", v)),
            },
            Value::clone,
        )
    }

    /// Coerce inbound values to a boolean: booleans, the strings
    /// `"true"`/`"false"`, and numbers (nonzero is true) pass.
    pub fn boolean() -> Self {
        Self::new(
            |v| match v {
                Value::Bool(_) => Ok(v.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                Value::Number(n) => Ok(Value::Bool(n.as_f64().unwrap_or(0.0) != 0.0)),
                _ => Err(ConvertError::new("boolean", v)),
            },
            Value::clone,
        )
    }

    /// Coerce inbound scalars to their string rendering; containers fail.
    pub fn string() -> Self {
        Self::new(
            |v| match v {
                Value::String(_) => Ok(v.clone()),
                Value::Null | Value::Bool(_) | Value::Number(_) => {
                    Ok(Value::String(v.to_string()))
                }
                _ => Err(ConvertError::new("string", v)),
            },
            Value::clone,
        )
    }

    pub(crate) fn decode(&self, value: &Value) -> Result<Value, ConvertError> {
        (self.decode)(value)
    }

    pub(crate) fn encode(&self, value: &Value) -> Value {
        (self.encode)(value)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Where a write came from. External writes (renderer edits) are decoded
/// through the codec and never echoed back onto the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    External,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A mutable cell handle. Cloning and `view()` share the id (and bump its
/// handle count); dropping the last handle evicts the id from the registry.
pub struct Model {
    registry: Registry,
    id: CellId,
    path: Path,
}

impl Model {
    /// Create a cell owning `value`, with the identity codec.
    pub fn new(registry: &Registry, value: Value) -> Self {
        Self::with_codec(registry, value, Codec::identity())
    }

    /// Create a cell owning `value` with an explicit codec.
    pub fn with_codec(registry: &Registry, value: Value, codec: Codec) -> Self {
        let id = registry.create_cell(value, codec);
        Self {
            registry: registry.clone(),
            id,
            path: Path::new(),
        }
    }

    /// Owner handle for an already-live id; the caller has acquired the count.
    pub(crate) fn from_registry(registry: Registry, id: CellId) -> Self {
        Self {
            registry,
            id,
            path: Path::new(),
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle addresses a sub-location rather than the raw value.
    pub fn is_view(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A view one segment deeper. Shares the id; resolution is lazy, so an
    /// out-of-range segment surfaces on the first read or write, not here.
    pub fn view(&self, segment: impl Into<PathSeg>) -> Model {
        self.registry.acquire(self.id);
        let mut path = self.path.clone();
        path.push(segment.into());
        Model {
            registry: self.registry.clone(),
            id: self.id,
            path,
        }
    }

    fn state(&self) -> Rc<std::cell::RefCell<crate::registry::CellState>> {
        self.registry
            .state(self.id)
            .expect("live handle implies a registry entry")
    }

    /// Mark this cell with a renderer-side modifier flag (e.g. `"number"`).
    pub fn add_modifier(&self, modifier: impl Into<String>) {
        let state = self.state();
        let mut st = state.borrow_mut();
        let modifier = modifier.into();
        if !st.modifiers.contains(&modifier) {
            st.modifiers.push(modifier);
        }
    }

    /// The resolved value at this handle's path.
    pub fn value(&self) -> Result<Value, PathError> {
        let state = self.state();
        let st = state.borrow();
        path::lookup(&st.value, &self.path).cloned()
    }

    /// Local write; shorthand for `set_value(value, Origin::Local)`.
    pub fn set(&self, value: Value) -> Result<(), PathError> {
        self.set_value(value, Origin::Local)
    }

    /// Write `value` at this handle's path.
    ///
    /// Deep-equal writes are a complete no-op. External writes decode
    /// through the codec first; a decode failure is logged and contained.
    /// Local writes enqueue a wire mutation and request a head-gated flush
    /// after all subscribers have run.
    pub fn set_value(&self, value: Value, origin: Origin) -> Result<(), PathError> {
        let state = self.state();

        // Decode before comparing, so the no-op check sees the same
        // representation that would be stored.
        let incoming = match origin {
            Origin::External => match state.borrow().codec.decode(&value) {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(
                        target: "rxbridge::model",
                        cell = %self.id,
                        %err,
                        "inbound conversion failed; keeping current value"
                    );
                    return Ok(());
                }
            },
            Origin::Local => value,
        };

        {
            let st = state.borrow();
            if *path::lookup(&st.value, &self.path)? == incoming {
                return Ok(());
            }
        }

        let (channel, subscribers, encoded, raw_after) = {
            let mut st = state.borrow_mut();
            if self.path.is_empty() {
                st.value = incoming.clone();
            } else {
                path::assign(&mut st.value, &self.path, incoming.clone())?;
            }
            (
                st.channel.clone(),
                st.subscribers.clone(),
                st.codec.encode(&incoming),
                st.value.clone(),
            )
        };

        let local = origin == Origin::Local;
        if local {
            if let Some(ch) = &channel {
                ch.enqueue_mutation(Mutation {
                    id: self.id,
                    path: self.path.clone(),
                    value: encoded,
                });
            }
        }

        // Subscribers may freely read or write cells: all borrows are
        // released before the first callback runs.
        for sub in &subscribers {
            (sub.callback)(&raw_after);
        }

        if local {
            if let Some(ch) = &channel {
                ch.flush(Some(self.id));
            }
        }
        Ok(())
    }

    /// Register `callback` to run on every future value change of this id,
    /// receiving the cell's full (path-less) value after the write. With
    /// `immediate`, the callback also runs once when a channel is first
    /// attached, supporting "sync current state on attach".
    pub fn add_callback(&self, callback: impl Fn(&Value) + 'static, immediate: bool) {
        self.subscribe(Rc::new(callback), immediate);
    }

    /// Whether a synchronization channel is currently attached.
    pub fn has_channel(&self) -> bool {
        self.state().borrow().channel.is_some()
    }
}

impl Reactive for Model {
    fn cell_id(&self) -> CellId {
        self.id
    }

    fn value(&self) -> Result<Value, PathError> {
        Model::value(self)
    }

    fn render_as_data(&self) -> Value {
        let state = self.state();
        let st = state.borrow();
        let mut record = serde_json::Map::new();
        record.insert("@".into(), Value::from(self.id.raw()));
        if self.path.is_empty() {
            record.insert("value".into(), st.codec.encode(&st.value));
        } else {
            record.insert("path".into(), path::to_wire(&self.path));
        }
        if !st.modifiers.is_empty() {
            record.insert(
                "modifiers".into(),
                Value::Array(
                    st.modifiers
                        .iter()
                        .map(|m| Value::String(m.clone()))
                        .collect(),
                ),
            );
        }
        Value::Object(record)
    }

    fn subscribe(&self, callback: Rc<dyn Fn(&Value)>, immediate: bool) {
        let state = self.state();
        state
            .borrow_mut()
            .subscribers
            .push(Subscriber { callback, immediate });
    }

    fn attach_channel(&self, channel: &Rc<dyn SyncChannel>, flush: bool) {
        let state = self.state();
        {
            let st = state.borrow();
            if let Some(existing) = &st.channel {
                if Rc::ptr_eq(existing, channel) {
                    return;
                }
            }
        }

        // Path handles delegate the snapshot to their path-less owner form:
        // the enqueued record always carries the id's full value.
        let (encoded, immediates, raw) = {
            let mut st = state.borrow_mut();
            st.channel = Some(Rc::clone(channel));
            (
                st.codec.encode(&st.value),
                st.subscribers
                    .iter()
                    .filter(|s| s.immediate)
                    .cloned()
                    .collect::<Vec<_>>(),
                st.value.clone(),
            )
        };

        channel.enqueue_mutation(Mutation {
            id: self.id,
            path: Path::new(),
            value: encoded,
        });
        for sub in &immediates {
            (sub.callback)(&raw);
        }
        if flush {
            channel.flush(Some(self.id));
        }
    }

    fn detach_channel(&self) {
        self.state().borrow_mut().channel = None;
    }

    fn to_shared(&self) -> Rc<dyn Reactive> {
        Rc::new(self.clone())
    }
}

impl Clone for Model {
    fn clone(&self) -> Self {
        self.registry.acquire(self.id);
        Self {
            registry: self.registry.clone(),
            id: self.id,
            path: self.path.clone(),
        }
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
