#![forbid(unsafe_code)]

//! The [`Binding`] contract and its direct implementation, [`ValueBinding`].
//!
//! A binding is a named, observable container of a `T`. Consumers read it with
//! [`get`](Binding::get), write it with [`set`](Binding::set), and observe it
//! with [`subscribe`](Binding::subscribe).
//!
//! # Usage
//!
//! ```
//! use ftui_binding::{Binding, BindingEvent, ValueBinding};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let name = ValueBinding::new(None::<String>);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let _sub = name.observe(move |ev: &BindingEvent<Option<String>>| {
//!     log.borrow_mut().push(ev.clone());
//! });
//!
//! name.set(Some("Ada".to_string()));
//! name.set(Some("Ada".to_string())); // equal value: no event
//! assert_eq!(seen.borrow().len(), 1);
//! ```
//!
//! # Invariants
//!
//! 1. A `"value"` event fires iff the new value differs from the old one
//!    under `PartialEq`.
//! 2. Listeners run in registration order, after the new value is stored.
//! 3. Clones of a binding handle share value, listeners, and [`BindingId`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::BindingError;
use crate::event::{BindingEvent, BindingId};
use crate::observer::{ListenerRegistry, Subscription};

/// An observable value container.
///
/// Implementations fire [`BindingEvent::Value`] whenever their exposed value
/// changes, and never when an equal value is written.
pub trait Binding<T> {
    /// Identity of this binding.
    fn id(&self) -> BindingId;

    /// Current exposed value.
    fn get(&self) -> T;

    /// Write a new value.
    ///
    /// # Errors
    ///
    /// Fails when the binding cannot be written: it is derived
    /// ([`BindingError::ReadOnly`]), has no target
    /// ([`BindingError::Unbound`]), or the target rejected the write
    /// ([`BindingError::Access`]).
    fn set(&self, value: T) -> Result<(), BindingError>;

    /// Register a listener for this binding's events.
    fn subscribe(&self, listener: Box<dyn Fn(&BindingEvent<T>)>) -> Subscription;

    /// Whether [`set`](Binding::set) always fails.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Register a closure as listener.
    fn observe(&self, listener: impl Fn(&BindingEvent<T>) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe(Box::new(listener))
    }
}

impl<T, B: Binding<T> + ?Sized> Binding<T> for Rc<B> {
    fn id(&self) -> BindingId {
        (**self).id()
    }

    fn get(&self) -> T {
        (**self).get()
    }

    fn set(&self, value: T) -> Result<(), BindingError> {
        (**self).set(value)
    }

    fn subscribe(&self, listener: Box<dyn Fn(&BindingEvent<T>)>) -> Subscription {
        (**self).subscribe(listener)
    }

    fn is_read_only(&self) -> bool {
        (**self).is_read_only()
    }
}

// ---------------------------------------------------------------------------
// ValueBinding<T>
// ---------------------------------------------------------------------------

struct ValueInner<T> {
    id: BindingId,
    value: RefCell<T>,
    version: Cell<u64>,
    listeners: ListenerRegistry<BindingEvent<T>>,
}

/// A binding that simply holds its value.
pub struct ValueBinding<T> {
    inner: Rc<ValueInner<T>>,
}

impl<T> Clone for ValueBinding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ValueBinding<T> {
    /// Create a binding holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ValueInner {
                id: BindingId::next(),
                value: RefCell::new(value),
                version: Cell::new(0),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Identity of this binding.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` and notify listeners if it differs from the current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let old = {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner
            .listeners
            .notify(&BindingEvent::value(self.inner.id, old, value));
        true
    }

    /// Replace the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.with(f);
        self.set(next)
    }

    /// Number of changes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> for ValueBinding<T> {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn get(&self) -> T {
        ValueBinding::get(self)
    }

    fn set(&self, value: T) -> Result<(), BindingError> {
        ValueBinding::set(self, value);
        Ok(())
    }

    fn subscribe(&self, listener: Box<dyn Fn(&BindingEvent<T>)>) -> Subscription {
        self.inner.listeners.subscribe_boxed(listener)
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for ValueBinding<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueBinding")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingScope
// ---------------------------------------------------------------------------

/// Collects subscriptions for a logical consumer (e.g., a widget adapter).
///
/// Dropping the scope releases every held subscription, disconnecting the
/// consumer from all bindings it observed.
///
/// # Invariants
///
/// 1. After drop or [`clear`](Self::clear), no callback from this scope fires.
/// 2. `binding_count` equals the number of held subscriptions.
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Keep `sub` alive until the scope is dropped or cleared.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Observe `binding` for as long as this scope lives.
    pub fn subscribe<T, B: Binding<T> + ?Sized>(
        &mut self,
        binding: &B,
        callback: impl Fn(&BindingEvent<T>) + 'static,
    ) -> &mut Self {
        let sub = binding.subscribe(Box::new(callback));
        self.subscriptions.push(sub);
        self
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release all subscriptions; the scope stays usable.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}
