//! Event-source collaborator and the `from_event` factory
//!
//! An event source registers and deregisters listeners by name. Listener
//! identity is the `Rc` allocation: removal deregisters exactly the
//! listener that was added.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{Observable, Subscription};

/// Callback registered on an event source
pub type Listener<E> = Rc<dyn Fn(&E)>;

/// Push-based external event source
pub trait EventSource<E> {
    fn add_event_listener(&self, event_name: &str, listener: Listener<E>);

    fn remove_event_listener(&self, event_name: &str, listener: &Listener<E>);
}

/// In-process event source with named channels
pub struct EventTarget<E> {
    listeners: RefCell<HashMap<String, Vec<Listener<E>>>>,
}

impl<E> EventTarget<E> {
    pub fn new() -> Self {
        EventTarget {
            listeners: RefCell::new(HashMap::new()),
        }
    }

    /// Deliver `event` to every listener of `event_name`
    /// Returns the number of listeners invoked
    pub fn dispatch(&self, event_name: &str, event: &E) -> usize {
        // Snapshot: listeners may add or remove listeners while running
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .borrow()
            .get(event_name)
            .cloned()
            .unwrap_or_default();
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners
            .borrow()
            .get(event_name)
            .map_or(0, Vec::len)
    }
}

impl<E> Default for EventTarget<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventTarget<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut names: Vec<(&String, usize)> =
            listeners.iter().map(|(name, l)| (name, l.len())).collect();
        names.sort();
        f.debug_struct("EventTarget")
            .field("listeners", &names)
            .finish()
    }
}

impl<E> EventSource<E> for EventTarget<E> {
    fn add_event_listener(&self, event_name: &str, listener: Listener<E>) {
        let mut listeners = self.listeners.borrow_mut();
        let registered = listeners.entry(event_name.to_owned()).or_default();
        // Adding the same listener twice is a no-op
        if !registered.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            registered.push(listener);
        }
    }

    fn remove_event_listener(&self, event_name: &str, listener: &Listener<E>) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(registered) = listeners.get_mut(event_name) {
            registered.retain(|l| !Rc::ptr_eq(l, listener));
            if registered.is_empty() {
                listeners.remove(event_name);
            }
        }
    }
}

impl<E: Clone + 'static> Observable<E> {
    /// Adapt `event_name` on `source` into an observable
    ///
    /// Each activation registers one listener forwarding every event to
    /// `next`. The stream never completes or fails on its own; only
    /// unsubscribing ends it, which removes that exact listener.
    pub fn from_event<S>(source: Rc<S>, event_name: impl Into<String>) -> Observable<E>
    where
        S: EventSource<E> + ?Sized + 'static,
    {
        let event_name: Rc<str> = event_name.into().into();
        Observable::new(move |subscriber| {
            let listener: Listener<E> = Rc::new(move |event: &E| subscriber.next(event.clone()));
            source.add_event_listener(&event_name, Rc::clone(&listener));
            tracing::trace!(event = %event_name, "listener registered");

            let source = Rc::clone(&source);
            let event_name = Rc::clone(&event_name);
            Subscription::new(move || {
                source.remove_event_listener(&event_name, &listener);
                tracing::trace!(event = %event_name, "listener removed");
            })
        })
    }
}
