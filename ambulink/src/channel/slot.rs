//! Single-subscriber callback slots.

use std::fmt;

type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Holds at most one callback for an event kind.
///
/// Registering replaces the previous callback. Firing an empty slot is a
/// no-op.
pub struct Slot<T> {
    handler: Option<Handler<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self { handler: None }
    }

    pub fn set<F>(&mut self, handler: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    pub fn clear(&mut self) {
        self.handler = None;
    }

    pub fn is_set(&self) -> bool {
        self.handler.is_some()
    }

    /// Invoke the callback. Returns false if the slot is empty.
    pub fn fire(&self, value: &T) -> bool {
        match &self.handler {
            Some(handler) => {
                handler(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("set", &self.is_set()).finish()
    }
}
