#![forbid(unsafe_code)]

//! Backend event callbacks invokable from the renderer.
//!
//! UI collaborators register handlers here and embed the returned id in the
//! serialized component tree; the renderer fires them through the channel
//! with an optional JSON payload. Ids live in their own namespace, disjoint
//! from cell and placeholder ids.
//!
//! Handler failures are values, not panics: a handler returns `Result`, and
//! the channel logs the error without letting it cross the boundary.

use ahash::RandomState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::Value;
use crate::error::EventError;

/// Identity of a registered event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventCallbackId(u64);

impl EventCallbackId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventCallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type EventHandler = dyn Fn(Option<&Value>) -> Result<(), EventError>;

struct EventTable {
    handlers: HashMap<EventCallbackId, Rc<EventHandler>, RandomState>,
    next: u64,
}

/// The event-callback table. Cloning shares the same table.
#[derive(Clone)]
pub struct EventCallbacks {
    inner: Rc<RefCell<EventTable>>,
}

impl EventCallbacks {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EventTable {
                handlers: HashMap::default(),
                next: 1,
            })),
        }
    }

    /// Register a handler; the returned id goes into the component tree.
    pub fn register(
        &self,
        handler: impl Fn(Option<&Value>) -> Result<(), EventError> + 'static,
    ) -> EventCallbackId {
        let mut table = self.inner.borrow_mut();
        let id = EventCallbackId(table.next);
        table.next += 1;
        table.handlers.insert(id, Rc::new(handler));
        id
    }

    /// Invoke a handler with the renderer-supplied payload.
    pub fn invoke(&self, id: EventCallbackId, payload: Option<&Value>) -> Result<(), EventError> {
        let handler = self
            .inner
            .borrow()
            .handlers
            .get(&id)
            .cloned()
            .ok_or(EventError::UnknownCallback { id: id.raw() })?;
        handler(payload)
    }

    /// Remove a handler; returns whether it existed.
    pub fn remove(&self, id: EventCallbackId) -> bool {
        self.inner.borrow_mut().handlers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().handlers.is_empty()
    }
}

impl Default for EventCallbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCallbacks")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_invoke_remove() {
        let events = EventCallbacks::new();
        let seen = Rc::new(RefCell::new(None));

        let seen_clone = Rc::clone(&seen);
        let id = events.register(move |payload| {
            *seen_clone.borrow_mut() = payload.cloned();
            Ok(())
        });

        events.invoke(id, Some(&json!({"x": 1}))).unwrap();
        assert_eq!(*seen.borrow(), Some(json!({"x": 1})));

        assert!(events.remove(id));
        assert!(matches!(
            events.invoke(id, None),
            Err(EventError::UnknownCallback { .. })
        ));
    }

    #[test]
    fn handlers_may_fire_without_payload() {
        let events = EventCallbacks::new();
        let count = Rc::new(RefCell::new(0));

        let count_clone = Rc::clone(&count);
        let id = events.register(move |payload| {
            assert!(payload.is_none());
            *count_clone.borrow_mut() += 1;
            Ok(())
        });

        events.invoke(id, None).unwrap();
        events.invoke(id, None).unwrap();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn handler_failure_is_a_value() {
        let events = EventCallbacks::new();
        let id = events.register(|_| Err(EventError::failed("validation refused")));

        let err = events.invoke(id, None).unwrap_err();
        assert_eq!(err.to_string(), "event callback failed: validation refused");
    }

    #[test]
    fn handler_may_register_another_handler() {
        let events = EventCallbacks::new();
        let events_clone = events.clone();
        let id = events.register(move |_| {
            events_clone.register(|_| Ok(()));
            Ok(())
        });

        events.invoke(id, None).unwrap();
        assert_eq!(events.len(), 2);
    }
}
