#![forbid(unsafe_code)]

//! Read-only bindings derived from other bindings.
//!
//! A [`ComputedBinding`] caches `f(source)` and recomputes it whenever a source
//! fires a `"value"` event. It fires its own `"value"` event only when the
//! recomputed result differs from the cached one, so chains of derived values
//! stay quiet when an intermediate result is unchanged.
//!
//! Buffering events from a source do not trigger recomputation; only the
//! source's exposed value matters.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::binding::Binding;
use crate::error::BindingError;
use crate::event::{BindingEvent, BindingId};
use crate::observer::{ListenerRegistry, Subscription};

struct ComputedInner<T> {
    id: BindingId,
    eval: Box<dyn Fn() -> T>,
    value: RefCell<T>,
    listeners: ListenerRegistry<BindingEvent<T>>,
    sources: RefCell<Vec<Subscription>>,
}

impl<T: Clone + PartialEq + 'static> ComputedInner<T> {
    fn recompute(&self) {
        let next = (self.eval)();
        let old = {
            let mut current = self.value.borrow_mut();
            if *current == next {
                return;
            }
            std::mem::replace(&mut *current, next.clone())
        };
        self.listeners
            .notify(&BindingEvent::value(self.id, old, next));
    }
}

/// A read-only binding whose value is a function of other bindings.
pub struct ComputedBinding<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for ComputedBinding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ComputedBinding<T> {
    fn from_eval(eval: Box<dyn Fn() -> T>) -> Self {
        let initial = eval();
        Self {
            inner: Rc::new(ComputedInner {
                id: BindingId::next(),
                eval,
                value: RefCell::new(initial),
                listeners: ListenerRegistry::new(),
                sources: RefCell::new(Vec::new()),
            }),
        }
    }

    fn watch<S: 'static>(&self, source: &impl Binding<S>) {
        let weak: Weak<ComputedInner<T>> = Rc::downgrade(&self.inner);
        let sub = source.subscribe(Box::new(move |ev: &BindingEvent<S>| {
            if let (BindingEvent::Value(_), Some(inner)) = (ev, weak.upgrade()) {
                inner.recompute();
            }
        }));
        self.inner.sources.borrow_mut().push(sub);
    }

    /// Derive a binding from one source.
    #[must_use]
    pub fn map<S, B>(source: &B, map: impl Fn(&S) -> T + 'static) -> Self
    where
        S: 'static,
        B: Binding<S> + Clone + 'static,
    {
        let src = source.clone();
        let computed = Self::from_eval(Box::new(move || map(&src.get())));
        computed.watch(source);
        computed
    }

    /// Derive a binding from two sources.
    #[must_use]
    pub fn map2<S1, S2, B1, B2>(a: &B1, b: &B2, map: impl Fn(&S1, &S2) -> T + 'static) -> Self
    where
        S1: 'static,
        S2: 'static,
        B1: Binding<S1> + Clone + 'static,
        B2: Binding<S2> + Clone + 'static,
    {
        let src1 = a.clone();
        let src2 = b.clone();
        let computed = Self::from_eval(Box::new(move || map(&src1.get(), &src2.get())));
        computed.watch(a);
        computed.watch(b);
        computed
    }

    /// Identity of this binding.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// Cached derived value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Force a recomputation, e.g. after a source changed without notifying.
    pub fn refresh(&self) {
        self.inner.recompute();
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> for ComputedBinding<T> {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn get(&self) -> T {
        ComputedBinding::get(self)
    }

    fn set(&self, _value: T) -> Result<(), BindingError> {
        Err(BindingError::ReadOnly {
            binding: self.inner.id,
        })
    }

    fn subscribe(&self, listener: Box<dyn Fn(&BindingEvent<T>)>) -> Subscription {
        self.inner.listeners.subscribe_boxed(listener)
    }

    fn is_read_only(&self) -> bool {
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for ComputedBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedBinding")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("sources", &self.inner.sources.borrow().len())
            .finish()
    }
}
