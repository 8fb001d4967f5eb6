#![forbid(unsafe_code)]

//! Order-preserving listener storage.
//!
//! [`ListenerRegistry`] is the single place listeners live. Bindings, beans and
//! presentation models all dispatch through it so that notification order is
//! identical everywhere.
//!
//! # Invariants
//!
//! 1. Listeners are called in registration order.
//! 2. `notify` iterates a snapshot taken when dispatch starts; listeners
//!    registered during dispatch first see the *next* event.
//! 3. A listener whose [`Subscription`] is dropped (even mid-dispatch) is not
//!    called again.
//! 4. No interior borrow is held while a listener runs, so listeners may
//!    subscribe, unsubscribe, or trigger nested notifications.
//!
//! # Failure Modes
//!
//! - Listener panic: propagates to the caller of `notify`; remaining listeners
//!   for that event are skipped.
//! - Registry dropped while subscriptions alive: dropping the subscriptions
//!   later is a no-op.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<E> = Rc<dyn Fn(&E)>;

struct Slot<E> {
    id: u64,
    /// Cleared by the subscription's release, before the slot is removed.
    alive: Rc<Cell<bool>>,
    callback: Callback<E>,
}

struct RegistryInner<E> {
    next_id: u64,
    slots: Vec<Slot<E>>,
}

/// Ordered collection of listeners for events of type `E`.
pub struct ListenerRegistry<E> {
    inner: Rc<RefCell<RegistryInner<E>>>,
}

impl<E> ListenerRegistry<E> {
    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().slots.is_empty()
    }
}

impl<E: 'static> ListenerRegistry<E> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription {
        self.subscribe_boxed(Box::new(listener))
    }

    /// Register an already boxed listener.
    pub fn subscribe_boxed(&self, listener: Box<dyn Fn(&E)>) -> Subscription {
        let alive = Rc::new(Cell::new(true));
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.slots.push(Slot {
                id,
                alive: Rc::clone(&alive),
                callback: Rc::from(listener),
            });
            id
        };
        let weak: Weak<RefCell<RegistryInner<E>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            alive.set(false);
            if let Some(inner) = weak.upgrade() {
                let removed = {
                    let mut inner = inner.borrow_mut();
                    inner
                        .slots
                        .iter()
                        .position(|slot| slot.id == id)
                        .map(|pos| inner.slots.remove(pos))
                };
                // The callback may own subscriptions of its own; drop it
                // after the borrow is released.
                drop(removed);
            }
        })
    }

    /// Deliver `event` to every listener registered when dispatch starts.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<(Rc<Cell<bool>>, Callback<E>)> = self
            .inner
            .borrow()
            .slots
            .iter()
            .map(|slot| (Rc::clone(&slot.alive), Rc::clone(&slot.callback)))
            .collect();
        for (alive, callback) in snapshot {
            if alive.get() {
                callback(event);
            }
        }
    }
}

impl<E: 'static> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.inner.borrow().slots.len())
            .finish()
    }
}

/// RAII guard for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Keep the listener registered for the lifetime of its source.
    pub fn detach(mut self) {
        self.release = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.release.is_some())
            .finish()
    }
}
