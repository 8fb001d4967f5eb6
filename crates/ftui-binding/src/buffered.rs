#![forbid(unsafe_code)]

//! Buffered bindings: stage local edits, then commit or discard them.
//!
//! A [`BufferedBinding`] wraps a delegate [`Binding`] (the object of record)
//! and exposes its own, possibly divergent value plus a `"buffering"` flag.
//!
//! # State Machine
//!
//! ```text
//!              set(v != value)            delegate changed (SYNCED only)
//!   ┌────────┐ ─────────────────────────► ┌───────┐ ◄──────────────────┐
//!   │ SYNCED │                            │ DIRTY │                    │
//!   └────────┘ ◄───────────────────────── └───────┘ ───────────────────┘
//!                flush() / commit() /       set(v), delegate changes:
//!                set_binding(d)             no buffering event
//! ```
//!
//! | Operation | Events, in order |
//! |-----------|------------------|
//! | `set(v)` from SYNCED | `value(old, v)`, `buffering(false, true)` |
//! | `set(v)` from DIRTY | `value(old, v)` |
//! | delegate change from SYNCED | `buffering(false, true)` |
//! | delegate change from DIRTY | none |
//! | `flush()` | `value(old, delegate)` if different, `buffering(true, false)` if DIRTY |
//! | `commit()` | delegate's own events, then `buffering(true, false)` if DIRTY |
//! | `set_binding(d)` | `value(old, d)` if different, `buffering(true, false)` if DIRTY |
//!
//! # Invariants
//!
//! 1. Outside a delegate's own dispatch, `!is_buffering()` implies
//!    `get() == delegate.get()`.
//! 2. A value event always precedes the buffering event of the same operation.
//! 3. `commit()` never fires a `"value"` event on the buffer itself.
//! 4. The delegate handler ignores changes that leave no divergence, which
//!    makes the delegate's re-entrant notification during `commit()` a no-op.
//!
//! # Failure Modes
//!
//! - Delegate write fails in `commit()`: the buffer stays DIRTY, keeps its
//!   local value, and returns a [`CommitFailure`].
//! - `commit()` with no delegate: fails with [`BindingError::Unbound`].
//! - `set_binding()` while DIRTY: the local edit is discarded, never committed.
//!   Use [`commit_and_rebind`](BufferedBinding::commit_and_rebind) to keep it.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::binding::Binding;
use crate::error::{BindingError, CommitFailure};
use crate::event::{BindingEvent, BindingId};
use crate::observer::{ListenerRegistry, Subscription};

struct BufferState<T> {
    value: T,
    buffering: bool,
}

struct BufferedInner<T> {
    id: BindingId,
    state: RefCell<BufferState<T>>,
    delegate: RefCell<Option<Rc<dyn Binding<T>>>>,
    delegate_sub: RefCell<Option<Subscription>>,
    listeners: ListenerRegistry<BindingEvent<T>>,
}

impl<T: Clone + PartialEq + 'static> BufferedInner<T> {
    /// Store `next` as the exposed value, firing `"value"` if it differs.
    fn replace_value(&self, next: T) {
        let old = {
            let mut state = self.state.borrow_mut();
            if state.value == next {
                return;
            }
            std::mem::replace(&mut state.value, next.clone())
        };
        self.listeners
            .notify(&BindingEvent::value(self.id, old, next));
    }

    fn set_buffering(&self, buffering: bool) {
        {
            let mut state = self.state.borrow_mut();
            if state.buffering == buffering {
                return;
            }
            state.buffering = buffering;
        }
        trace!(binding = %self.id, buffering, "buffering changed");
        self.listeners
            .notify(&BindingEvent::buffering(self.id, !buffering, buffering));
    }

    fn on_delegate_change(&self, delegate_value: &T) {
        let diverged = {
            let state = self.state.borrow();
            !state.buffering && state.value != *delegate_value
        };
        if diverged {
            trace!(binding = %self.id, "delegate changed underneath");
            self.set_buffering(true);
        }
    }

    fn current_delegate(&self) -> Option<Rc<dyn Binding<T>>> {
        self.delegate.borrow().clone()
    }

    fn attach(self: &Rc<Self>, delegate: Rc<dyn Binding<T>>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let sub = delegate.subscribe(Box::new(move |ev: &BindingEvent<T>| {
            if let (BindingEvent::Value(change), Some(inner)) = (ev, weak.upgrade()) {
                inner.on_delegate_change(&change.new);
            }
        }));
        *self.delegate.borrow_mut() = Some(delegate);
        *self.delegate_sub.borrow_mut() = Some(sub);
    }

    fn detach(&self) -> Option<Rc<dyn Binding<T>>> {
        let sub = self.delegate_sub.borrow_mut().take();
        drop(sub);
        self.delegate.borrow_mut().take()
    }
}

/// A binding that buffers edits in front of a delegate binding.
pub struct BufferedBinding<T> {
    inner: Rc<BufferedInner<T>>,
}

impl<T> Clone for BufferedBinding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> BufferedBinding<T> {
    /// Buffer in front of `delegate`, starting SYNCED at its current value.
    #[must_use]
    pub fn new(delegate: impl Binding<T> + 'static) -> Self {
        let delegate: Rc<dyn Binding<T>> = Rc::new(delegate);
        let buffer = Self::unbound(delegate.get());
        buffer.inner.attach(delegate);
        buffer
    }

    /// A buffer with no delegate, exposing `value`.
    #[must_use]
    pub fn unbound(value: T) -> Self {
        Self {
            inner: Rc::new(BufferedInner {
                id: BindingId::next(),
                state: RefCell::new(BufferState {
                    value,
                    buffering: false,
                }),
                delegate: RefCell::new(None),
                delegate_sub: RefCell::new(None),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Identity of this binding.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// The exposed (possibly buffered) value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.state.borrow().value.clone()
    }

    /// Whether the exposed value diverges from the delegate.
    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.inner.state.borrow().buffering
    }

    /// The current delegate, if bound.
    #[must_use]
    pub fn delegate(&self) -> Option<Rc<dyn Binding<T>>> {
        self.inner.current_delegate()
    }

    /// Whether a delegate is set.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.delegate.borrow().is_some()
    }

    /// Stage a local edit.
    ///
    /// Returns whether the exposed value changed.
    pub fn set(&self, value: T) -> bool {
        if self.inner.state.borrow().value == value {
            return false;
        }
        self.inner.replace_value(value);
        self.inner.set_buffering(true);
        true
    }

    /// Discard local edits and adopt the delegate's current value.
    pub fn flush(&self) {
        if let Some(delegate) = self.inner.current_delegate() {
            self.inner.replace_value(delegate.get());
        }
        self.inner.set_buffering(false);
    }

    /// Write the exposed value into the delegate.
    ///
    /// # Errors
    ///
    /// Returns a [`CommitFailure`] if there is no delegate or the delegate
    /// rejects the write. The buffer then stays in its current state.
    pub fn commit(&self) -> Result<(), CommitFailure> {
        let id = self.inner.id;
        let Some(delegate) = self.inner.current_delegate() else {
            return Err(CommitFailure {
                binding: id,
                cause: BindingError::Unbound { binding: id },
            });
        };
        let value = self.get();
        if let Err(cause) = delegate.set(value) {
            warn!(binding = %id, delegate = %delegate.id(), error = %cause, "commit failed");
            return Err(CommitFailure { binding: id, cause });
        }
        trace!(binding = %id, delegate = %delegate.id(), "committed");
        self.inner.set_buffering(false);
        Ok(())
    }

    /// Replace the delegate, discarding any pending local edit.
    pub fn set_binding(&self, delegate: impl Binding<T> + 'static) {
        let delegate: Rc<dyn Binding<T>> = Rc::new(delegate);
        let previous = self.inner.detach();
        trace!(
            binding = %self.inner.id,
            from = ?previous.as_ref().map(|d| d.id()),
            to = %delegate.id(),
            discarded = self.is_buffering(),
            "rebinding"
        );
        drop(previous);
        self.inner.replace_value(delegate.get());
        self.inner.set_buffering(false);
        self.inner.attach(delegate);
    }

    /// Commit the pending edit to the current delegate, then rebind.
    ///
    /// # Errors
    ///
    /// If the commit fails (including when there is no delegate), the buffer
    /// keeps its delegate, value and buffering flag, and the failure is
    /// returned.
    pub fn commit_and_rebind(&self, delegate: impl Binding<T> + 'static) -> Result<(), CommitFailure> {
        self.commit()?;
        self.set_binding(delegate);
        Ok(())
    }

    /// Stop observing the delegate. The exposed value and flag are kept.
    pub fn unbind(&self) {
        let previous = self.inner.detach();
        if let Some(previous) = previous {
            trace!(binding = %self.inner.id, from = %previous.id(), "unbound");
        }
    }

    /// Number of listeners on this binding.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> for BufferedBinding<T> {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn get(&self) -> T {
        BufferedBinding::get(self)
    }

    fn set(&self, value: T) -> Result<(), BindingError> {
        BufferedBinding::set(self, value);
        Ok(())
    }

    fn subscribe(&self, listener: Box<dyn Fn(&BindingEvent<T>)>) -> Subscription {
        self.inner.listeners.subscribe_boxed(listener)
    }
}

impl<T: fmt::Debug> fmt::Debug for BufferedBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("BufferedBinding")
            .field("id", &self.inner.id)
            .field("value", &state.value)
            .field("buffering", &state.buffering)
            .field(
                "delegate",
                &self.inner.delegate.borrow().as_ref().map(|d| d.id()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ValueBinding;

    type Log<T> = Rc<RefCell<Vec<BindingEvent<T>>>>;

    fn record<T: Clone + 'static>(binding: &impl Binding<T>, log: &Log<T>) -> Subscription {
        let sink = Rc::clone(log);
        binding.subscribe(Box::new(move |ev: &BindingEvent<T>| {
            sink.borrow_mut().push(ev.clone());
        }))
    }

    #[test]
    fn starts_synced_with_delegate_value() {
        let d = ValueBinding::new(3);
        let b = BufferedBinding::new(d.clone());
        assert_eq!(b.get(), 3);
        assert!(!b.is_buffering());
        assert!(b.is_bound());
        assert_eq!(b.delegate().map(|d| d.id()), Some(d.id()));
    }

    #[test]
    fn local_edit_fires_value_then_buffering() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d.clone());
        let log = Log::default();
        let _sub = record(&b, &log);

        assert!(b.set(1));
        assert!(b.set(2));
        assert!(!b.set(2));

        assert_eq!(
            *log.borrow(),
            vec![
                BindingEvent::value(b.id(), 0, 1),
                BindingEvent::buffering(b.id(), false, true),
                BindingEvent::value(b.id(), 1, 2),
            ]
        );
        assert_eq!(d.get(), 0);
    }

    #[test]
    fn delegate_change_while_synced_only_raises_buffering() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d.clone());
        let log = Log::default();
        let _sub = record(&b, &log);

        d.set(1);
        assert_eq!(*log.borrow(), vec![BindingEvent::buffering(b.id(), false, true)]);
        assert_eq!(b.get(), 0);
    }

    #[test]
    fn delegate_change_while_dirty_is_ignored() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d.clone());
        b.set(5);
        let log = Log::default();
        let _sub = record(&b, &log);

        d.set(1);
        d.set(2);
        assert!(log.borrow().is_empty());
        assert_eq!(b.get(), 5);
    }

    #[test]
    fn flush_adopts_delegate_value() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d.clone());
        d.set(1);
        let log = Log::default();
        let _sub = record(&b, &log);

        b.flush();
        assert_eq!(
            *log.borrow(),
            vec![
                BindingEvent::value(b.id(), 0, 1),
                BindingEvent::buffering(b.id(), true, false),
            ]
        );
    }

    #[test]
    fn flush_when_synced_is_noop() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d);
        let log = Log::default();
        let _sub = record(&b, &log);
        b.flush();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn commit_orders_delegate_event_before_buffering_end() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d.clone());
        b.set(1);

        let log: Log<i32> = Log::default();
        let _d = record(&d, &log);
        let _b = record(&b, &log);

        b.commit().unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                BindingEvent::value(d.id(), 0, 1),
                BindingEvent::buffering(b.id(), true, false),
            ]
        );
        assert_eq!(d.get(), 1);
        assert!(!b.is_buffering());
    }

    #[test]
    fn commit_when_synced_is_quiet() {
        let d = ValueBinding::new(4);
        let b = BufferedBinding::new(d.clone());
        let log = Log::default();
        let _d = record(&d, &log);
        let _b = record(&b, &log);
        b.commit().unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn commit_back_to_delegate_value_ends_buffering() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d.clone());
        b.set(1);
        b.set(0);
        assert!(b.is_buffering());
        b.commit().unwrap();
        assert!(!b.is_buffering());
        assert_eq!(d.version(), 0);
    }

    #[test]
    fn rebind_while_dirty_discards_edit() {
        let d0 = ValueBinding::new(0);
        let d2 = ValueBinding::new(2);
        let b = BufferedBinding::new(d0.clone());
        b.set(1);
        let log = Log::default();
        let _sub = record(&b, &log);

        b.set_binding(d2.clone());
        assert_eq!(
            *log.borrow(),
            vec![
                BindingEvent::value(b.id(), 1, 2),
                BindingEvent::buffering(b.id(), true, false),
            ]
        );
        assert_eq!(d0.get(), 0);
        assert_eq!(d2.get(), 2);
        assert_eq!(d0.listener_count(), 0);
        assert_eq!(d2.listener_count(), 1);
    }

    #[test]
    fn rebind_then_old_delegate_is_silent() {
        let old = ValueBinding::new(0);
        let new = ValueBinding::new(0);
        let b = BufferedBinding::new(old.clone());
        b.set_binding(new.clone());
        let log = Log::default();
        let _sub = record(&b, &log);

        old.set(9);
        assert!(log.borrow().is_empty());
        new.set(9);
        assert_eq!(*log.borrow(), vec![BindingEvent::buffering(b.id(), false, true)]);
    }

    #[test]
    fn commit_and_rebind_without_delegate_keeps_edit() {
        let b = BufferedBinding::unbound("draft");
        b.set("edited");
        let target = ValueBinding::new("other");

        let failure = b.commit_and_rebind(target.clone()).unwrap_err();
        assert_eq!(failure.cause, BindingError::Unbound { binding: b.id() });
        assert_eq!(b.get(), "edited");
        assert!(b.is_buffering());
        assert!(!b.is_bound());
        assert_eq!(target.get(), "other");
    }

    #[test]
    fn rebind_synced_onto_different_value_fires_value_only() {
        let old = ValueBinding::new(0);
        let new = ValueBinding::new(5);
        let b = BufferedBinding::new(old.clone());
        let log = Log::default();
        let _sub = record(&b, &log);

        b.set_binding(new.clone());
        assert_eq!(*log.borrow(), vec![BindingEvent::value(b.id(), 0, 5)]);
        assert!(!b.is_buffering());
    }

    #[test]
    fn commit_through_shared_delegate_dirties_sibling() {
        let d = ValueBinding::new(0);
        let first = BufferedBinding::new(d.clone());
        let second = BufferedBinding::new(d.clone());
        let log = Log::default();
        let _sub = record(&second, &log);

        first.set(1);
        first.commit().unwrap();

        assert!(!first.is_buffering());
        assert!(second.is_buffering());
        assert_eq!(second.get(), 0);
        assert_eq!(*log.borrow(), vec![BindingEvent::buffering(second.id(), false, true)]);
    }

    #[test]
    fn commit_and_rebind_keeps_edit() {
        let d0 = ValueBinding::new(0);
        let d2 = ValueBinding::new(2);
        let b = BufferedBinding::new(d0.clone());
        b.set(1);

        b.commit_and_rebind(d2.clone()).unwrap();
        assert_eq!(d0.get(), 1);
        assert_eq!(b.get(), 2);
        assert!(!b.is_buffering());
    }

    #[test]
    fn unbound_buffer() {
        let b = BufferedBinding::unbound("draft".to_string());
        assert!(!b.is_bound());
        b.set("edited".to_string());
        assert!(b.is_buffering());

        let err = b.commit().unwrap_err();
        assert_eq!(err.cause, BindingError::Unbound { binding: b.id() });
        assert!(b.is_buffering());

        b.flush();
        assert!(!b.is_buffering());
        assert_eq!(b.get(), "edited");
    }

    #[test]
    fn unbind_keeps_state() {
        let d = ValueBinding::new(0);
        let b = BufferedBinding::new(d.clone());
        b.set(3);
        b.unbind();
        assert_eq!(d.listener_count(), 0);
        assert_eq!(b.get(), 3);
        assert!(b.is_buffering());
        d.set(7);
        assert_eq!(b.get(), 3);
    }

    #[test]
    fn buffers_stack() {
        let d = ValueBinding::new(0);
        let inner = BufferedBinding::new(d.clone());
        let outer = BufferedBinding::new(inner.clone());

        outer.set(5);
        outer.commit().unwrap();
        assert_eq!(inner.get(), 5);
        assert!(inner.is_buffering());
        assert_eq!(d.get(), 0);

        inner.commit().unwrap();
        assert_eq!(d.get(), 5);
        assert!(!outer.is_buffering());
    }

    #[test]
    fn debug_shows_state() {
        let b = BufferedBinding::unbound(1);
        b.set(2);
        let text = format!("{b:?}");
        assert!(text.contains("buffering: true"));
        assert!(text.contains("delegate: None"));
    }
}
